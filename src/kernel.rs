//! The fixed set of kernel families usable for the low-rank approximation.
//!
//! Kernels are symmetric, side-effect free pairwise evaluations. Each family
//! carries its own hyperparameter schema; the names it exposes are the
//! configuration keys whose changes trigger a feature-map rebuild in the
//! energy function.

use core::str::FromStr;

use nalgebra::DVector;

use crate::config::Configuration;
use crate::error::Error;

/// A kernel family with its current hyperparameters.
///
/// # Examples
///
/// ```
/// use csanneal::{Configuration, Kernel};
/// use nalgebra::DVector;
///
/// let mut kernel: Kernel = "RBF".parse().unwrap();
/// kernel.set_hyper_parameters(&Configuration::from_iter([("bandwidth", 2.0)]));
///
/// let a = DVector::from_vec(vec![0.0, 0.0]);
/// let b = DVector::from_vec(vec![1.0, 1.0]);
/// let k = kernel.evaluate(&a, &b);
/// assert!(k > 0.0 && k <= 1.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kernel {
    /// Gaussian radial basis kernel `exp(-r^2 / (2 s^2))`.
    Rbf {
        /// The length scale `s`.
        bandwidth: f64,
    },
    /// Polynomial kernel `(x . y + offset)^degree`.
    Polynomial {
        /// The polynomial degree.
        degree: f64,
        /// The additive offset.
        offset: f64,
    },
    /// Exponential kernel `exp(-r / s)`.
    Exponential {
        /// The length scale `s`.
        bandwidth: f64,
    },
    /// Laplacian kernel `exp(-|x - y|_1 / s)`.
    Laplacian {
        /// The length scale `s`.
        bandwidth: f64,
    },
    /// Cauchy kernel `1 / (1 + r^2 / s^2)`.
    Cauchy {
        /// The length scale `s`.
        bandwidth: f64,
    },
    /// Rational quadratic kernel `1 - r^2 / (r^2 + c)`.
    RationalQuadratic {
        /// The shift constant `c`.
        shift: f64,
    },
    /// Wave kernel `(theta / r) sin(r / theta)`, with value 1 at `r = 0`.
    Wave {
        /// The wavelength parameter `theta`.
        theta: f64,
    },
}

impl Kernel {
    /// The hyperparameter names this family reads from a configuration.
    ///
    /// These are exactly the keys whose values gate the kernel rebuild cache.
    #[must_use]
    pub fn hyper_parameter_names(&self) -> &'static [&'static str] {
        match self {
            Self::Rbf { .. }
            | Self::Exponential { .. }
            | Self::Laplacian { .. }
            | Self::Cauchy { .. } => &["bandwidth"],
            Self::Polynomial { .. } => &["degree", "offset"],
            Self::RationalQuadratic { .. } => &["shift"],
            Self::Wave { .. } => &["theta"],
        }
    }

    /// Updates hyperparameters from the keys present in `config`; keys the
    /// family does not know are ignored, known keys absent from `config`
    /// keep their current value.
    pub fn set_hyper_parameters(&mut self, config: &Configuration) -> &mut Self {
        match self {
            Self::Rbf { bandwidth }
            | Self::Exponential { bandwidth }
            | Self::Laplacian { bandwidth }
            | Self::Cauchy { bandwidth } => {
                if let Some(v) = config.get("bandwidth") {
                    *bandwidth = v;
                }
            }
            Self::Polynomial { degree, offset } => {
                if let Some(v) = config.get("degree") {
                    *degree = v;
                }
                if let Some(v) = config.get("offset") {
                    *offset = v;
                }
            }
            Self::RationalQuadratic { shift } => {
                if let Some(v) = config.get("shift") {
                    *shift = v;
                }
            }
            Self::Wave { theta } => {
                if let Some(v) = config.get("theta") {
                    *theta = v;
                }
            }
        }
        self
    }

    /// Evaluates the kernel between two points of equal dimension.
    #[must_use]
    pub fn evaluate(&self, a: &DVector<f64>, b: &DVector<f64>) -> f64 {
        match *self {
            Self::Rbf { bandwidth } => {
                let r2 = (a - b).norm_squared();
                (-r2 / (2.0 * bandwidth * bandwidth)).exp()
            }
            Self::Polynomial { degree, offset } => (a.dot(b) + offset).powf(degree),
            Self::Exponential { bandwidth } => (-(a - b).norm() / bandwidth).exp(),
            Self::Laplacian { bandwidth } => {
                let l1: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum();
                (-l1 / bandwidth).exp()
            }
            Self::Cauchy { bandwidth } => {
                let r2 = (a - b).norm_squared();
                1.0 / (1.0 + r2 / (bandwidth * bandwidth))
            }
            Self::RationalQuadratic { shift } => {
                let r2 = (a - b).norm_squared();
                1.0 - r2 / (r2 + shift)
            }
            Self::Wave { theta } => {
                let r = (a - b).norm();
                if r < f64::EPSILON {
                    1.0
                } else {
                    (theta / r) * (r / theta).sin()
                }
            }
        }
    }
}

impl FromStr for Kernel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "RBF" => Ok(Self::Rbf { bandwidth: 1.0 }),
            "Polynomial" => Ok(Self::Polynomial {
                degree: 2.0,
                offset: 1.0,
            }),
            "Exponential" => Ok(Self::Exponential { bandwidth: 1.0 }),
            "Laplacian" => Ok(Self::Laplacian { bandwidth: 1.0 }),
            "Cauchy" => Ok(Self::Cauchy { bandwidth: 1.0 }),
            "RationalQuadratic" => Ok(Self::RationalQuadratic { shift: 1.0 }),
            "Wave" => Ok(Self::Wave { theta: 1.0 }),
            other => Err(Error::UnknownKernel(other.to_owned())),
        }
    }
}
