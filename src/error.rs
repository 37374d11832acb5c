/// Convenience alias for results produced by this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by the annealing engine and its kernel machinery.
///
/// All variants are fatal to the optimization run that raised them; there is
/// no internal retry. The stochastic accept/reject cycle of the optimizer is
/// the core algorithm, not an error-recovery mechanism.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Returned when a variant tag does not name one of the five coupled
    /// annealing variants.
    #[error("unknown annealing variant '{0}' (expected one of MuSA, BA, M, MwVC, SA)")]
    UnknownVariant(String),

    /// Returned when a kernel family tag does not name one of the supported
    /// kernels.
    #[error(
        "unknown kernel family '{0}' (expected one of RBF, Polynomial, Exponential, \
         Laplacian, Cauchy, RationalQuadratic, Wave)"
    )]
    UnknownKernel(String),

    /// Returned when a string-keyed option carries a value that cannot be
    /// parsed.
    #[error("invalid value '{value}' for option '{key}'")]
    InvalidOption {
        /// The option key.
        key: String,
        /// The rejected raw value.
        value: String,
    },

    /// Returned when the optimizer is configured with a non-positive
    /// landscape size.
    #[error("invalid grid size: landscape must have at least one member")]
    InvalidGridSize,

    /// Returned when the initial configuration carries no hyperparameters.
    #[error("initial configuration must contain at least one hyperparameter")]
    EmptyConfiguration,

    /// Returned when an operation requires a hyperparameter the configuration
    /// does not carry.
    #[error("configuration is missing hyperparameter '{0}'")]
    MissingHyperParameter(String),

    /// Returned when a dataset with no rows is handed to a component that
    /// needs at least one.
    #[error("dataset must contain at least one point")]
    EmptyDataset,

    /// Returned when a selection-style routine is asked for an order
    /// statistic outside `[1, len]`.
    #[error("selection rank {k} out of range [1, {len}]")]
    RankOutOfRange {
        /// The requested rank (1-based).
        k: usize,
        /// The number of available elements.
        len: usize,
    },

    /// Returned when a point's dimension does not match the dataset's.
    #[error("dimension mismatch: expected {expected} but got {got}")]
    DimensionMismatch {
        /// The expected number of dimensions.
        expected: usize,
        /// The actual number of dimensions.
        got: usize,
    },

    /// Returned when a prototype subset size is not in `[1, n]`.
    #[error("invalid subset size {m}: must be in [1, {n}]")]
    InvalidSubsetSize {
        /// The requested prototype count.
        m: usize,
        /// The dataset size.
        n: usize,
    },

    /// Returned when the Girolami filter rejects every eigenpair, leaving no
    /// components to build a feature map from.
    #[error("no eigenpairs retained: kernel matrix yields an empty feature map")]
    EmptyFeatureMap,

    /// Returned when cross-validation is requested with fewer than two folds
    /// or more folds than data points.
    #[error("invalid fold count {folds} for {n} points")]
    InvalidFolds {
        /// The requested number of folds.
        folds: usize,
        /// The dataset size.
        n: usize,
    },

    /// Returned when the ridge system is singular and cannot be solved.
    #[error("ridge normal equations are singular (reg_param = {reg_param})")]
    SingularSystem {
        /// The regularization strength in effect.
        reg_param: f64,
    },
}
