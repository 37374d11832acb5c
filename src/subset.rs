//! Entropy-based greedy prototype selection.
//!
//! Picks `m` representative points whose quadratic Rényi entropy under a
//! weighted density estimate is (locally) maximal: a well-spread subset
//! stands in for the full data distribution when the low-rank kernel
//! approximation is built.

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::Rng;

use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::kde::WeightedKde;
use crate::stats;

/// Selects up to `m` prototypes from `dataset` by greedy entropy search.
///
/// The subset is seeded with the `m` highest-density points (order statistics
/// found by quickselect) and then refined by random swap proposals: a swap
/// that raises the subset's quadratic Rényi entropy is kept. The search stops
/// after `max_iterations` proposals or when an accepted swap improves the
/// entropy by less than `tolerance`.
///
/// # Errors
///
/// Returns [`Error::InvalidSubsetSize`] when `m` is not in `[1, n]`.
pub fn select(
    dataset: &Dataset,
    kde: &WeightedKde,
    m: usize,
    max_iterations: usize,
    tolerance: f64,
    rng: &mut StdRng,
) -> Result<Vec<DVector<f64>>> {
    let n = dataset.len();
    if m == 0 || m > n {
        return Err(Error::InvalidSubsetSize { m, n });
    }
    if m == n {
        return Ok(dataset.features().to_vec());
    }

    let densities: Vec<f64> = dataset.features().iter().map(|x| kde.pdf(x)).collect();

    // Density threshold of the m-th densest point; rank is the (n - m + 1)-th
    // smallest, always within [1, n] here.
    let mut scratch = densities.clone();
    let threshold = stats::quickselect(&mut scratch, n - m + 1, rng)?;

    let mut chosen: Vec<usize> = Vec::with_capacity(m);
    let mut rest: Vec<usize> = Vec::with_capacity(n - m);
    for (i, &d) in densities.iter().enumerate() {
        if d >= threshold && chosen.len() < m {
            chosen.push(i);
        } else {
            rest.push(i);
        }
    }

    let subset_points = |chosen: &[usize]| -> Vec<DVector<f64>> {
        chosen
            .iter()
            .map(|&i| dataset.features()[i].clone())
            .collect()
    };

    let mut current = subset_points(&chosen);
    let mut entropy = kde.quadratic_renyi_entropy(&current);

    for _ in 0..max_iterations {
        if rest.is_empty() {
            break;
        }
        let in_idx = rng.random_range(0..chosen.len());
        let out_idx = rng.random_range(0..rest.len());

        core::mem::swap(&mut chosen[in_idx], &mut rest[out_idx]);
        let candidate = subset_points(&chosen);
        let candidate_entropy = kde.quadratic_renyi_entropy(&candidate);

        if candidate_entropy > entropy {
            let improvement = candidate_entropy - entropy;
            current = candidate;
            entropy = candidate_entropy;
            if improvement < tolerance {
                break;
            }
        } else {
            // revert the proposal
            core::mem::swap(&mut chosen[in_idx], &mut rest[out_idx]);
        }
    }

    Ok(current)
}
