//! The energy landscape evaluation protocol.
//!
//! An [`EnergyFunction`] maps a hyperparameter configuration to a scalar
//! energy (lower is better). The provided [`KernelEnergy`] rebuilds the
//! low-rank kernel feature map only when the kernel-relevant hyperparameters
//! actually changed, refits primal-space ridge regression under k-fold
//! cross-validation, and returns `1 - score`.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Configuration;
use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::kde::WeightedKde;
use crate::kernel::Kernel;
use crate::nystrom::FeatureMap;
use crate::subset;

/// A scalar objective over hyperparameter configurations, lower is better.
///
/// Implemented by [`KernelEnergy`] and, through [`FnEnergy`], by plain
/// closures — which keeps the optimizer testable against synthetic
/// landscapes.
pub trait EnergyFunction {
    /// Evaluates the energy of `config`.
    ///
    /// # Errors
    ///
    /// Propagates any configuration or numerical error; the optimizer aborts
    /// on the first failure.
    fn energy(&self, config: &Configuration) -> Result<f64>;
}

/// Adapts a `Fn(&Configuration) -> Result<f64>` closure into an
/// [`EnergyFunction`].
pub struct FnEnergy<F>(F);

impl<F> FnEnergy<F>
where
    F: Fn(&Configuration) -> Result<f64>,
{
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EnergyFunction for FnEnergy<F>
where
    F: Fn(&Configuration) -> Result<f64>,
{
    fn energy(&self, config: &Configuration) -> Result<f64> {
        (self.0)(config)
    }
}

/// The outcome of one cross-validation pass.
#[derive(Clone, Copy, Debug)]
pub struct CvOutcome {
    /// Mean score over training folds.
    pub train_metric: f64,
    /// Mean score over held-out folds.
    pub test_metric: f64,
    /// The performance score in `[0, 1]` fed into the energy.
    pub score: f64,
}

/// K-fold cross-validation over a projected primal feature representation.
pub trait CrossValidator {
    /// Fits and scores a regularized primal model over `folds` splits.
    ///
    /// `reuse_cache` is true when the kernel hyperparameters (and therefore
    /// the projected features) are unchanged since the previous call, so an
    /// implementation may reuse fold bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFolds`] for an unusable fold count and
    /// [`Error::SingularSystem`] when a fold's normal equations cannot be
    /// solved.
    fn crossvalidate(
        &self,
        features: &[DVector<f64>],
        labels: &[f64],
        folds: usize,
        reg_param: f64,
        reuse_cache: bool,
    ) -> Result<CvOutcome>;
}

/// Solves the ridge normal equations `(X^T X + reg I) w = X^T y` over the
/// given feature rows.
///
/// # Errors
///
/// Returns [`Error::SingularSystem`] when the regularized Gram matrix has no
/// Cholesky factorization.
pub fn ridge_fit(
    features: &[DVector<f64>],
    labels: &[f64],
    reg_param: f64,
) -> Result<DVector<f64>> {
    let dim = features.first().map_or(0, DVector::len);
    let mut xtx = DMatrix::zeros(dim, dim);
    let mut xty = DVector::zeros(dim);
    for (x, &y) in features.iter().zip(labels.iter()) {
        xtx += x * x.transpose();
        xty += x * y;
    }
    for i in 0..dim {
        xtx[(i, i)] += reg_param;
    }
    xtx.cholesky()
        .map(|chol| chol.solve(&xty))
        .ok_or(Error::SingularSystem { reg_param })
}

/// Ridge-regression cross-validator with deterministic round-robin folds.
///
/// Scoring: classification accuracy when the labels are binary (`{-1, 1}` or
/// `{0, 1}`), otherwise `1 / (1 + mse)`; both lie in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RidgeCv;

impl RidgeCv {
    #[allow(clippy::cast_precision_loss)]
    fn score(predictions: &[f64], labels: &[f64], binary: Option<f64>) -> f64 {
        if let Some(threshold) = binary {
            let hits = predictions
                .iter()
                .zip(labels.iter())
                .filter(|(&p, &y)| (p > threshold) == (y > threshold))
                .count() as f64;
            hits / predictions.len() as f64
        } else {
            let mse = predictions
                .iter()
                .zip(labels.iter())
                .map(|(p, y)| (p - y) * (p - y))
                .sum::<f64>()
                / predictions.len() as f64;
            1.0 / (1.0 + mse)
        }
    }

    /// The decision threshold when labels are binary, `None` otherwise.
    fn binary_threshold(labels: &[f64]) -> Option<f64> {
        if labels.iter().all(|&y| y == -1.0 || y == 1.0) {
            Some(0.0)
        } else if labels.iter().all(|&y| y == 0.0 || y == 1.0) {
            Some(0.5)
        } else {
            None
        }
    }
}

impl CrossValidator for RidgeCv {
    fn crossvalidate(
        &self,
        features: &[DVector<f64>],
        labels: &[f64],
        folds: usize,
        reg_param: f64,
        _reuse_cache: bool,
    ) -> Result<CvOutcome> {
        let n = features.len();
        if folds < 2 || folds > n {
            return Err(Error::InvalidFolds { folds, n });
        }

        let binary = Self::binary_threshold(labels);
        let mut train_total = 0.0;
        let mut test_total = 0.0;

        for fold in 0..folds {
            let in_test = |i: usize| i % folds == fold;

            let mut train_x = Vec::new();
            let mut train_y = Vec::new();
            let mut test_x = Vec::new();
            let mut test_y = Vec::new();
            for i in 0..n {
                if in_test(i) {
                    test_x.push(features[i].clone());
                    test_y.push(labels[i]);
                } else {
                    train_x.push(features[i].clone());
                    train_y.push(labels[i]);
                }
            }

            let weights = ridge_fit(&train_x, &train_y, reg_param)?;
            let predict =
                |rows: &[DVector<f64>]| rows.iter().map(|x| weights.dot(x)).collect::<Vec<_>>();

            train_total += Self::score(&predict(&train_x), &train_y, binary);
            test_total += Self::score(&predict(&test_x), &test_y, binary);
        }

        #[allow(clippy::cast_precision_loss)]
        let folds_f = folds as f64;
        let test_metric = test_total / folds_f;
        Ok(CvOutcome {
            train_metric: train_total / folds_f,
            test_metric,
            score: test_metric.clamp(0.0, 1.0),
        })
    }
}

/// Mutable evaluation state, exclusively owned by the in-flight energy call.
#[derive(Debug)]
struct EnergyCache {
    rng: StdRng,
    current_config: Option<Configuration>,
    /// The kernel-relevant submap the cached feature map was built from.
    kernel_subset: Option<Configuration>,
    prototypes: Vec<DVector<f64>>,
    feature_map: Option<FeatureMap>,
    projected: Vec<DVector<f64>>,
    model_params: DVector<f64>,
    rebuilds: usize,
}

/// The cross-validated kernel-model energy function.
///
/// Holds the training set, a kernel family template, and a lazily rebuilt
/// feature-map cache keyed by exact equality of the kernel-relevant
/// hyperparameter submap.
///
/// # Examples
///
/// ```no_run
/// use csanneal::{Configuration, Dataset, KernelEnergy};
/// use csanneal::energy::EnergyFunction;
/// use nalgebra::DVector;
///
/// let data = Dataset::new(
///     (0..20).map(|i| DVector::from_vec(vec![f64::from(i)])).collect(),
///     (0..20).map(|i| if i < 10 { -1.0 } else { 1.0 }).collect(),
/// ).unwrap();
///
/// let energy = KernelEnergy::builder(data).kernel("RBF").unwrap().build().unwrap();
/// let config = Configuration::from_iter([("RegParam", 1.0), ("bandwidth", 2.0)]);
/// let e = energy.energy(&config).unwrap();
/// assert!((0.0..=1.0).contains(&e));
/// ```
#[derive(Debug)]
pub struct KernelEnergy<C: CrossValidator = RidgeCv> {
    dataset: Dataset,
    kernel: Kernel,
    subset_size: usize,
    folds: usize,
    selector_iterations: usize,
    selector_tolerance: f64,
    validator: C,
    cache: Mutex<EnergyCache>,
}

/// Builder for [`KernelEnergy`].
pub struct KernelEnergyBuilder {
    dataset: Dataset,
    kernel: Kernel,
    subset_size: Option<usize>,
    folds: usize,
    selector_iterations: usize,
    selector_tolerance: f64,
    seed: Option<u64>,
}

impl KernelEnergyBuilder {
    /// Selects the kernel family by tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownKernel`] for an unrecognized tag.
    pub fn kernel(mut self, tag: &str) -> Result<Self> {
        self.kernel = tag.parse()?;
        Ok(self)
    }

    /// Overrides the prototype count (default: `floor(sqrt(n))`).
    #[must_use]
    pub fn subset_size(mut self, m: usize) -> Self {
        self.subset_size = Some(m);
        self
    }

    /// Sets the number of cross-validation folds (default 4).
    #[must_use]
    pub fn folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    /// Sets the prototype selector's swap budget and stopping tolerance
    /// (defaults: 100 swaps, 1e-6).
    #[must_use]
    pub fn selector(mut self, max_iterations: usize, tolerance: f64) -> Self {
        self.selector_iterations = max_iterations;
        self.selector_tolerance = tolerance;
        self
    }

    /// Seeds the selector RNG for reproducibility.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the energy function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSubsetSize`] when an explicit prototype count
    /// is not in `[1, n]`.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn build(self) -> Result<KernelEnergy> {
        let n = self.dataset.len();
        let subset_size = match self.subset_size {
            Some(m) => {
                if m == 0 || m > n {
                    return Err(Error::InvalidSubsetSize { m, n });
                }
                m
            }
            None => ((n as f64).sqrt().floor() as usize).max(1),
        };
        let rng = self
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Ok(KernelEnergy {
            dataset: self.dataset,
            kernel: self.kernel,
            subset_size,
            folds: self.folds,
            selector_iterations: self.selector_iterations,
            selector_tolerance: self.selector_tolerance,
            validator: RidgeCv,
            cache: Mutex::new(EnergyCache {
                rng,
                current_config: None,
                kernel_subset: None,
                prototypes: Vec::new(),
                feature_map: None,
                projected: Vec::new(),
                model_params: DVector::zeros(0),
                rebuilds: 0,
            }),
        })
    }
}

impl KernelEnergy {
    /// Starts a builder over `dataset` with an RBF kernel template.
    #[must_use]
    pub fn builder(dataset: Dataset) -> KernelEnergyBuilder {
        KernelEnergyBuilder {
            dataset,
            kernel: Kernel::Rbf { bandwidth: 1.0 },
            subset_size: None,
            folds: 4,
            selector_iterations: 100,
            selector_tolerance: 1e-6,
            seed: None,
        }
    }

    /// Builds from a string-keyed options map.
    ///
    /// Recognized keys: `"kernel"` (family tag, default RBF) and `"subset"`
    /// (prototype count override).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownKernel`] for a bad kernel tag,
    /// [`Error::InvalidOption`] for an unparsable subset override, and
    /// [`Error::InvalidSubsetSize`] for an out-of-range one.
    pub fn from_options(dataset: Dataset, options: &HashMap<String, String>) -> Result<Self> {
        let mut builder = Self::builder(dataset);
        if let Some(tag) = options.get("kernel") {
            builder = builder.kernel(tag)?;
        }
        if let Some(raw) = options.get("subset") {
            let m: usize = raw.parse().map_err(|_| Error::InvalidOption {
                key: "subset".to_owned(),
                value: raw.clone(),
            })?;
            builder = builder.subset_size(m);
        }
        builder.build()
    }
}

impl<C: CrossValidator> KernelEnergy<C> {
    /// The number of feature-map rebuilds performed so far.
    ///
    /// Two evaluations with an identical kernel-relevant submap must not
    /// increase this count.
    #[must_use]
    pub fn rebuild_count(&self) -> usize {
        self.cache.lock().rebuilds
    }

    /// The full-data ridge fit from the most recent successful evaluation
    /// (empty before the first). The vector is re-initialized to ones
    /// whenever a rebuild changes the feature dimension, so it stays sized
    /// to the current feature map even when a later fold solve fails.
    #[must_use]
    pub fn model_parameters(&self) -> DVector<f64> {
        self.cache.lock().model_params.clone()
    }

    /// Predicts the label of a raw point with the most recent full-data fit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyFeatureMap`] before the first evaluation has
    /// built a feature map and [`Error::DimensionMismatch`] for a point of
    /// the wrong dimension.
    pub fn predict(&self, x: &DVector<f64>) -> Result<f64> {
        if x.len() != self.dataset.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dataset.dim(),
                got: x.len(),
            });
        }
        let cache = self.cache.lock();
        let map = cache.feature_map.as_ref().ok_or(Error::EmptyFeatureMap)?;
        Ok(cache.model_params.dot(&map.project(x)))
    }

    /// The configuration used by the most recent evaluation.
    #[must_use]
    pub fn current_configuration(&self) -> Option<Configuration> {
        self.cache.lock().current_config.clone()
    }
}

impl<C: CrossValidator> EnergyFunction for KernelEnergy<C> {
    fn energy(&self, config: &Configuration) -> Result<f64> {
        let mut cache = self.cache.lock();

        let relevant = config.subset(self.kernel.hyper_parameter_names().iter().copied());
        // true means "kernel unchanged"; it also gates fold-cache reuse below
        let kernel_unchanged =
            cache.feature_map.is_some() && cache.kernel_subset.as_ref() == Some(&relevant);

        if !kernel_unchanged {
            let mut kernel = self.kernel.clone();
            kernel.set_hyper_parameters(config);

            // prototype selection reruns only when the requested size moved
            if cache.prototypes.len() != self.subset_size {
                let kde = WeightedKde::silverman(self.dataset.features())?;
                let selected = subset::select(
                    &self.dataset,
                    &kde,
                    self.subset_size,
                    self.selector_iterations,
                    self.selector_tolerance,
                    &mut cache.rng,
                )?;
                cache.prototypes = selected;
            }

            let scaler = self.dataset.scaler();
            let map = FeatureMap::build(&cache.prototypes, kernel, &scaler)?;
            if map.dimension() != cache.model_params.len() {
                // keep the fit vector sized to the new map even if a later
                // solve fails
                cache.model_params = DVector::from_element(map.dimension(), 1.0);
            }
            cache.projected = self
                .dataset
                .features()
                .iter()
                .map(|x| map.project(x))
                .collect();

            trace_debug!(
                dimension = map.dimension(),
                prototypes = map.prototype_count(),
                "feature map rebuilt"
            );
            cache.feature_map = Some(map);
            cache.kernel_subset = Some(relevant);
            cache.rebuilds += 1;
        }

        let reg_param = config
            .get("RegParam")
            .ok_or_else(|| Error::MissingHyperParameter("RegParam".to_owned()))?;

        let outcome = self.validator.crossvalidate(
            &cache.projected,
            self.dataset.labels(),
            self.folds,
            reg_param,
            kernel_unchanged,
        )?;

        let fitted = ridge_fit(&cache.projected, self.dataset.labels(), reg_param)?;
        cache.model_params = fitted;
        cache.current_config = Some(config.clone());

        trace_debug!(score = outcome.score, "energy evaluated");
        Ok(1.0 - outcome.score)
    }
}
