//! The training-set collaborator: points, labels, and column statistics.

use nalgebra::DVector;

use crate::error::{Error, Result};

/// An in-memory training set of feature vectors with scalar labels.
///
/// Exposes the column-wise statistics the scaler and the bandwidth rule
/// need; iteration yields `(identifier, features, label)` triples where the
/// identifier is the insertion index.
#[derive(Clone, Debug)]
pub struct Dataset {
    features: Vec<DVector<f64>>,
    labels: Vec<f64>,
    dim: usize,
}

impl Dataset {
    /// Creates a dataset from parallel feature and label vectors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDataset`] for zero points and
    /// [`Error::DimensionMismatch`] when rows disagree in dimension or the
    /// label count differs from the row count.
    pub fn new(features: Vec<DVector<f64>>, labels: Vec<f64>) -> Result<Self> {
        let Some(first) = features.first() else {
            return Err(Error::EmptyDataset);
        };
        let dim = first.len();
        for row in &features {
            if row.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    got: row.len(),
                });
            }
        }
        if labels.len() != features.len() {
            return Err(Error::DimensionMismatch {
                expected: features.len(),
                got: labels.len(),
            });
        }
        Ok(Self {
            features,
            labels,
            dim,
        })
    }

    /// The number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Always `false`: construction rejects empty datasets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The feature dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The feature rows in insertion order.
    #[must_use]
    pub fn features(&self) -> &[DVector<f64>] {
        &self.features
    }

    /// The labels in insertion order.
    #[must_use]
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Iterates over `(identifier, features, label)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DVector<f64>, f64)> {
        self.features
            .iter()
            .zip(self.labels.iter())
            .enumerate()
            .map(|(id, (x, &y))| (id, x, y))
    }

    /// Column-wise means.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn column_means(&self) -> DVector<f64> {
        let mut sums = DVector::zeros(self.dim);
        for row in &self.features {
            sums += row;
        }
        sums / self.len() as f64
    }

    /// Column-wise unbiased variances (n − 1 denominator).
    ///
    /// Falls back to zeros for a single-point dataset.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn column_variances(&self) -> DVector<f64> {
        if self.len() < 2 {
            return DVector::zeros(self.dim);
        }
        let means = self.column_means();
        let mut ss = DVector::zeros(self.dim);
        for row in &self.features {
            let centered = row - &means;
            ss += centered.component_mul(&centered);
        }
        ss / (self.len() - 1) as f64
    }

    /// Builds the column scaler for this dataset's statistics.
    #[must_use]
    pub fn scaler(&self) -> ColumnScaler {
        ColumnScaler::from_stats(&self.column_means(), &self.column_variances())
    }
}

/// Centers and variance-normalizes points with fixed column statistics:
/// `scale(x) = (x - mean) / sqrt(var)`.
///
/// A column with (near-)zero variance uses divisor 1.0, so scaling stays
/// invertible and round-trips are exact.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnScaler {
    means: DVector<f64>,
    // sqrt of the column variances, degenerate columns clamped to 1.0
    divisors: DVector<f64>,
}

impl ColumnScaler {
    /// Creates a scaler from column means and variances.
    #[must_use]
    pub fn from_stats(means: &DVector<f64>, variances: &DVector<f64>) -> Self {
        let divisors = variances.map(|v| if v < f64::EPSILON { 1.0 } else { v.sqrt() });
        Self {
            means: means.clone(),
            divisors,
        }
    }

    /// Projects a raw point into the centered, variance-normalized space.
    #[must_use]
    pub fn scale(&self, x: &DVector<f64>) -> DVector<f64> {
        (x - &self.means).component_div(&self.divisors)
    }

    /// Inverse of [`ColumnScaler::scale`].
    #[must_use]
    pub fn unscale(&self, scaled: &DVector<f64>) -> DVector<f64> {
        scaled.component_mul(&self.divisors) + &self.means
    }
}
