//! Low-rank kernel approximation: Gram matrix, eigendecomposition, Girolami
//! component pruning, and the resulting Nystrom feature map.

use nalgebra::{DMatrix, DVector};

use crate::data::ColumnScaler;
use crate::error::{Error, Result};
use crate::kernel::Kernel;

/// The Girolami retention test for one eigenvector of an `m`-prototype Gram
/// matrix: keep the component iff `(|v|_1)^2 >= 2m / (1 + m)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn girolami_retains(eigenvector: &DVector<f64>, m: usize) -> bool {
    let l1: f64 = eigenvector.iter().map(|v| v.abs()).sum();
    let m = m as f64;
    l1 * l1 >= 2.0 * m / (1.0 + m)
}

/// A finite-dimensional primal feature map derived from the eigensystem of a
/// prototype Gram matrix (the Nystrom extension), plus a constant bias
/// feature.
///
/// Output dimension is the number of retained eigenpairs plus one.
#[derive(Clone, Debug)]
pub struct FeatureMap {
    scaled_prototypes: Vec<DVector<f64>>,
    kernel: Kernel,
    /// Retained eigenvalues, descending.
    eigenvalues: Vec<f64>,
    /// Retained eigenvectors as columns, aligned with `eigenvalues`.
    eigenvectors: DMatrix<f64>,
    scaler: ColumnScaler,
}

impl FeatureMap {
    /// Builds the feature map over `prototypes` with the given kernel.
    ///
    /// Prototypes are scaled with `scaler` (training-set column statistics)
    /// before the `m x m` Gram matrix is formed. Eigenpairs are sorted by
    /// descending eigenvalue; pairs failing the Girolami test or with a
    /// non-positive eigenvalue are dropped, retained pairs keep their
    /// relative order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDataset`] for an empty prototype set and
    /// [`Error::EmptyFeatureMap`] when no eigenpair survives the filter.
    pub fn build(
        prototypes: &[DVector<f64>],
        kernel: Kernel,
        scaler: &ColumnScaler,
    ) -> Result<Self> {
        let m = prototypes.len();
        if m == 0 {
            return Err(Error::EmptyDataset);
        }

        let scaled: Vec<DVector<f64>> = prototypes.iter().map(|p| scaler.scale(p)).collect();

        let gram = build_gram_matrix(&scaled, &kernel);
        let eigen = gram.symmetric_eigen();

        let mut order: Vec<usize> = (0..m).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut eigenvalues = Vec::new();
        let mut columns: Vec<DVector<f64>> = Vec::new();
        for &idx in &order {
            let value = eigen.eigenvalues[idx];
            let vector: DVector<f64> = eigen.eigenvectors.column(idx).into_owned();
            if value > 0.0 && girolami_retains(&vector, m) {
                eigenvalues.push(value);
                columns.push(vector);
            }
        }

        if eigenvalues.is_empty() {
            return Err(Error::EmptyFeatureMap);
        }

        let eigenvectors = DMatrix::from_columns(&columns);
        Ok(Self {
            scaled_prototypes: scaled,
            kernel,
            eigenvalues,
            eigenvectors,
            scaler: scaler.clone(),
        })
    }

    /// The output dimension: retained components plus the bias feature.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.eigenvalues.len() + 1
    }

    /// The number of prototypes backing the map.
    #[must_use]
    pub fn prototype_count(&self) -> usize {
        self.scaled_prototypes.len()
    }

    /// The retained eigenvalues, descending.
    #[must_use]
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Projects a raw point into the reduced feature space.
    ///
    /// The point is scaled, its kernel column against the prototypes is
    /// formed, and each retained component `j` contributes
    /// `lambda_j^(-1/2) * v_j . k(x, .)`. The final coordinate is the
    /// constant bias 1.0.
    #[must_use]
    pub fn project(&self, x: &DVector<f64>) -> DVector<f64> {
        let scaled = self.scaler.scale(x);
        let k_col = DVector::from_fn(self.scaled_prototypes.len(), |i, _| {
            self.kernel.evaluate(&scaled, &self.scaled_prototypes[i])
        });

        let mut out = DVector::zeros(self.dimension());
        for (j, &lambda) in self.eigenvalues.iter().enumerate() {
            out[j] = self.eigenvectors.column(j).dot(&k_col) / lambda.sqrt();
        }
        out[self.eigenvalues.len()] = 1.0;
        out
    }
}

/// The symmetric `m x m` Gram matrix over already-scaled prototypes. Each
/// entry is an independent pairwise evaluation; only the upper triangle is
/// computed.
fn build_gram_matrix(scaled: &[DVector<f64>], kernel: &Kernel) -> DMatrix<f64> {
    let m = scaled.len();
    let mut gram = DMatrix::zeros(m, m);
    for i in 0..m {
        for j in i..m {
            let k = kernel.evaluate(&scaled[i], &scaled[j]);
            gram[(i, j)] = k;
            gram[(j, i)] = k;
        }
    }
    gram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dataset;

    fn v(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    fn sample_dataset() -> Dataset {
        #[allow(clippy::cast_precision_loss)]
        let features: Vec<_> = (0..8)
            .map(|i| v(&[i as f64, (i as f64).sin()]))
            .collect();
        Dataset::new(features, vec![0.0; 8]).unwrap()
    }

    #[test]
    fn girolami_rejects_concentrated_eigenvector() {
        // all mass on one coordinate: l1 norm 1, 1 < 2*10/11
        let mut concentrated = DVector::zeros(10);
        concentrated[0] = 1.0;
        assert!(!girolami_retains(&concentrated, 10));
    }

    #[test]
    fn girolami_retains_spread_eigenvector() {
        // uniform unit vector: l1 norm sqrt(10), 10 >= 2*10/11
        let spread = DVector::from_element(10, 1.0 / 10.0_f64.sqrt());
        assert!(girolami_retains(&spread, 10));
    }

    #[test]
    fn gram_matrix_is_symmetric_with_unit_diagonal() {
        let data = sample_dataset();
        let scaler = data.scaler();
        let scaled: Vec<_> = data.features().iter().map(|x| scaler.scale(x)).collect();
        let gram = build_gram_matrix(&scaled, &Kernel::Rbf { bandwidth: 1.0 });
        for i in 0..gram.nrows() {
            assert!((gram[(i, i)] - 1.0).abs() < 1e-12);
            for j in 0..gram.ncols() {
                assert!((gram[(i, j)] - gram[(j, i)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn feature_map_appends_bias_and_orders_eigenvalues() {
        let data = sample_dataset();
        let scaler = data.scaler();
        let map =
            FeatureMap::build(data.features(), Kernel::Rbf { bandwidth: 1.0 }, &scaler).unwrap();

        assert_eq!(map.dimension(), map.eigenvalues().len() + 1);
        assert!(map.eigenvalues().windows(2).all(|w| w[0] >= w[1]));
        assert!(map.eigenvalues().iter().all(|&l| l > 0.0));

        let phi = map.project(&data.features()[3]);
        assert_eq!(phi.len(), map.dimension());
        assert!((phi[map.dimension() - 1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_prototype_set_is_rejected() {
        let data = sample_dataset();
        let scaler = data.scaler();
        assert!(matches!(
            FeatureMap::build(&[], Kernel::Rbf { bandwidth: 1.0 }, &scaler),
            Err(Error::EmptyDataset)
        ));
    }
}
