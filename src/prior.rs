//! Optional hyperparameter priors.
//!
//! A prior contributes a penalty of `-ln p(v)` per hyperparameter to the
//! energy of a candidate configuration. The penalty is applied only when a
//! prior is supplied for *every* hyperparameter key; a partial prior map
//! contributes nothing.

use std::collections::HashMap;

use crate::config::Configuration;

/// A univariate prior density over one hyperparameter.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HyperPrior {
    /// Uniform density on `[low, high]`.
    Uniform {
        /// Lower bound of the support.
        low: f64,
        /// Upper bound of the support.
        high: f64,
    },
    /// Gaussian density with the given mean and standard deviation.
    Gaussian {
        /// The mean.
        mean: f64,
        /// The standard deviation (must be positive).
        std_dev: f64,
    },
    /// Exponential density with the given rate, supported on `[0, inf)`.
    Exponential {
        /// The rate parameter (must be positive).
        rate: f64,
    },
}

impl HyperPrior {
    /// The natural log of the prior density at `x`.
    ///
    /// Outside the support the density is zero and the log-density is
    /// negative infinity, which makes the energy penalty infinite and the
    /// candidate effectively unacceptable.
    #[must_use]
    pub fn log_density(&self, x: f64) -> f64 {
        match *self {
            Self::Uniform { low, high } => {
                if x >= low && x <= high {
                    -(high - low).ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            Self::Gaussian { mean, std_dev } => {
                let z = (x - mean) / std_dev;
                -0.5 * z * z - std_dev.ln() - 0.5 * (2.0 * core::f64::consts::PI).ln()
            }
            Self::Exponential { rate } => {
                if x >= 0.0 {
                    rate.ln() - rate * x
                } else {
                    f64::NEG_INFINITY
                }
            }
        }
    }
}

/// The prior energy penalty of a configuration: the summed negative
/// log-density over all hyperparameters, or `0.0` when the prior map does
/// not cover every key.
#[must_use]
pub(crate) fn prior_penalty(config: &Configuration, priors: &HashMap<String, HyperPrior>) -> f64 {
    if config.names().any(|name| !priors.contains_key(name)) {
        return 0.0;
    }
    config
        .iter()
        .map(|(name, value)| -priors[name].log_density(value))
        .sum()
}
