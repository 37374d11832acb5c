#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]

//! Coupled Simulated Annealing (CSA) for global hyperparameter optimization,
//! tuned against a Nystrom-style low-rank kernel approximation.
//!
//! A fixed-size population of hyperparameter configurations (the *energy
//! landscape*) is driven through mutate/accept/reject cycles under a cooling
//! schedule. Each candidate is scored by an energy function that rebuilds a
//! low-rank kernel feature map only when the kernel-relevant hyperparameters
//! actually changed, cross-validates a primal ridge model, and returns
//! `1 - score`.
//!
//! # Getting started
//!
//! Optimize a synthetic landscape in a few lines:
//!
//! ```
//! use csanneal::{Configuration, CsaOptimizer, Variant};
//!
//! let optimizer = CsaOptimizer::from_fn(|c: &Configuration| {
//!     let x = c.get("x").unwrap_or(0.0);
//!     Ok((x - 3.0).powi(2))
//! })
//! .variant(Variant::MuSa)
//! .grid_size(6)
//! .max_iterations(30)
//! .seed(42)
//! .build()
//! .unwrap();
//!
//! let landscape = optimizer
//!     .optimize(&Configuration::from_iter([("x", 10.0)]))
//!     .unwrap();
//! println!("best energy: {}", landscape.best().unwrap().energy);
//! ```
//!
//! For real model selection, plug in [`KernelEnergy`] over a [`Dataset`]:
//! it selects prototypes by entropy criteria, eigendecomposes the prototype
//! Gram matrix, prunes components with the Girolami test, and cross-validates
//! ridge regression in the resulting primal feature space.
//!
//! # Core concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Configuration`] | A named hyperparameter vector. |
//! | [`Landscape`] | The population of `(energy, configuration)` pairs maintained across iterations. |
//! | [`Variant`] | One of the five acceptance/coupling variants (MuSA, BA, M, MwVC, SA). |
//! | [`CsaOptimizer`] | The annealing state machine: `optimize(initial) -> final landscape`. |
//! | [`KernelEnergy`] | The cross-validated kernel-model energy function with its rebuild cache. |
//! | [`FeatureMap`] | The Nystrom projection into the retained eigenspace plus bias. |
//! | [`Kernel`] | The fixed set of kernel families (RBF, Polynomial, Exponential, Laplacian, Cauchy, RationalQuadratic, Wave). |
//!
//! # Feature flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on configurations, landscapes, variants, kernels | off |
//! | `tracing` | Structured log events at iteration boundaries and kernel rebuilds | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod config;
mod csa;
mod data;
pub mod energy;
mod error;
mod kde;
pub mod kernel;
mod nystrom;
mod prior;
mod stats;
pub mod subset;
mod variant;

pub use config::{Configuration, Landscape, LandscapePoint};
pub use csa::{acceptance_temperature, mutation_temperature, CsaOptimizer, CsaOptimizerBuilder};
pub use data::{ColumnScaler, Dataset};
pub use energy::{CrossValidator, CvOutcome, EnergyFunction, FnEnergy, KernelEnergy, RidgeCv};
pub use error::{Error, Result};
pub use kde::WeightedKde;
pub use kernel::Kernel;
pub use nystrom::{girolami_retains, FeatureMap};
pub use prior::HyperPrior;
pub use variant::Variant;

/// Convenience re-exports for the common case.
pub mod prelude {
    pub use crate::config::{Configuration, Landscape, LandscapePoint};
    pub use crate::csa::CsaOptimizer;
    pub use crate::data::Dataset;
    pub use crate::energy::{EnergyFunction, KernelEnergy};
    pub use crate::error::{Error, Result};
    pub use crate::kernel::Kernel;
    pub use crate::variant::Variant;
}
