//! The coupled simulated annealing variant family.
//!
//! Each variant fixes three closed-form quantities: the coupling factor
//! aggregating landscape-wide energies, the acceptance probability of a
//! mutated candidate, and the desired variance of the acceptance
//! probabilities that drives the variance-controlled temperature update.
//!
//! All formulas evaluate energies shifted by the landscape maximum
//! (`E - max E`), which keeps the exponentials bounded; the shift cancels in
//! every acceptance ratio.

use core::str::FromStr;

use crate::error::Error;

/// The selectable acceptance/coupling variants.
///
/// `Sa` is classic uncoupled simulated annealing. It is only reachable by
/// explicitly naming it, so a mistyped tag fails with
/// [`Error::UnknownVariant`] instead of silently annealing uncoupled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    /// Multi-state simulated annealing: coupled acceptance of the candidate
    /// energy against the whole landscape.
    #[default]
    MuSa,
    /// Blind acceptance: couples on the current member's energy.
    Ba,
    /// Modified CSA with positive-exponent coupling.
    M,
    /// Modified CSA with variance-controlled acceptance temperature.
    MwVc,
    /// Classic simulated annealing (no coupling).
    Sa,
}

impl Variant {
    /// Returns `true` when the acceptance temperature follows the
    /// variance-controlled update rather than the `t0 / ln(k + 1)` schedule.
    #[must_use]
    pub fn variance_controlled(self) -> bool {
        matches!(self, Self::MwVc)
    }

    /// The desired variance of the acceptance probabilities for a landscape
    /// of `m` members.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn desired_variance(self, m: usize) -> f64 {
        let m = m as f64;
        match self {
            Self::MuSa | Self::Ba | Self::Sa => 0.99,
            Self::M | Self::MwVc => 0.99 * (m - 1.0) / (m * m),
        }
    }

    /// The coupling factor over shifted energies at temperature `t`.
    ///
    /// `shifted` holds `E_i - max E` for every landscape member.
    #[must_use]
    pub fn coupling_factor(self, shifted: &[f64], t: f64) -> f64 {
        match self {
            Self::MuSa | Self::Ba => shifted.iter().map(|&e| (-e / t).exp()).sum(),
            Self::M | Self::MwVc => shifted.iter().map(|&e| (e / t).exp()).sum(),
            Self::Sa => 1.0,
        }
    }

    /// The probability of accepting a candidate of shifted energy `e_new`
    /// against a member of shifted energy `e_old`, given the coupling factor
    /// `gamma` at temperature `t`.
    #[must_use]
    pub fn acceptance_probability(self, e_new: f64, e_old: f64, gamma: f64, t: f64) -> f64 {
        match self {
            Self::MuSa => {
                let w = (-e_new / t).exp();
                w / (w + gamma)
            }
            Self::Ba => 1.0 - (-e_old / t).exp() / gamma,
            Self::M | Self::MwVc => (e_old / t).exp() / gamma,
            Self::Sa => gamma / (1.0 + ((e_new - e_old) / t).exp()),
        }
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "MuSA" => Ok(Self::MuSa),
            "BA" => Ok(Self::Ba),
            "M" => Ok(Self::M),
            "MwVC" => Ok(Self::MwVc),
            "SA" => Ok(Self::Sa),
            other => Err(Error::UnknownVariant(other.to_owned())),
        }
    }
}

impl core::fmt::Display for Variant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let tag = match self {
            Self::MuSa => "MuSA",
            Self::Ba => "BA",
            Self::M => "M",
            Self::MwVc => "MwVC",
            Self::Sa => "SA",
        };
        f.write_str(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shifted(energies: &[f64]) -> Vec<f64> {
        let max = energies.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        energies.iter().map(|&e| e - max).collect()
    }

    #[test]
    fn coupling_positive_for_exponential_variants() {
        let shifted = shifted(&[0.2, 0.9, 0.5, 0.1]);
        for variant in [Variant::MuSa, Variant::Ba] {
            assert!(variant.coupling_factor(&shifted, 0.7) > 0.0);
        }
    }

    #[test]
    fn sa_coupling_is_unity() {
        assert!((Variant::Sa.coupling_factor(&[1.0, 2.0], 0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn desired_variance_matches_variant_family() {
        assert!((Variant::MuSa.desired_variance(10) - 0.99).abs() < 1e-12);
        assert!((Variant::Ba.desired_variance(3) - 0.99).abs() < 1e-12);
        // 0.99 (M - 1) / M^2 with M = 10
        assert!((Variant::M.desired_variance(10) - 0.99 * 9.0 / 100.0).abs() < 1e-12);
        assert!((Variant::MwVc.desired_variance(4) - 0.99 * 3.0 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn musa_acceptance_lies_in_unit_interval() {
        let shifted = shifted(&[0.4, 0.6, 0.8]);
        let gamma = Variant::MuSa.coupling_factor(&shifted, 0.3);
        for &e in &shifted {
            let p = Variant::MuSa.acceptance_probability(e, shifted[0], gamma, 0.3);
            assert!(p > 0.0 && p < 1.0, "p = {p}");
        }
    }

    #[test]
    fn sa_acceptance_prefers_lower_energy() {
        let better = Variant::Sa.acceptance_probability(-0.5, 0.0, 1.0, 0.2);
        let worse = Variant::Sa.acceptance_probability(0.5, 0.0, 1.0, 0.2);
        assert!(better > worse);
        assert!(worse > 0.0 && worse < 1.0);
    }

    #[test]
    fn parse_rejects_unknown_tag() {
        assert!("MuSA".parse::<Variant>().is_ok());
        assert!("MwVC".parse::<Variant>().is_ok());
        let err = "simulated".parse::<Variant>().unwrap_err();
        assert!(matches!(err, Error::UnknownVariant(_)));
    }
}
