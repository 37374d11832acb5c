//! Scalar statistics helpers shared by the density estimator and the
//! prototype selector.

use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{Error, Result};

/// Returns the `k`-th smallest value (1-based) of `values`.
///
/// Iterative quickselect with uniformly random pivot selection; the slice is
/// reordered in place. `k` outside `[1, len]` is a precondition violation.
pub(crate) fn quickselect(values: &mut [f64], k: usize, rng: &mut StdRng) -> Result<f64> {
    let len = values.len();
    if k == 0 || k > len {
        return Err(Error::RankOutOfRange { k, len });
    }

    let target = k - 1;
    let mut lo = 0;
    let mut hi = len;
    loop {
        if hi - lo == 1 {
            return Ok(values[lo]);
        }

        let pivot_idx = rng.random_range(lo..hi);
        values.swap(pivot_idx, hi - 1);
        let pivot = values[hi - 1];

        let mut store = lo;
        for i in lo..hi - 1 {
            if values[i] < pivot {
                values.swap(i, store);
                store += 1;
            }
        }
        values.swap(store, hi - 1);

        match target.cmp(&store) {
            core::cmp::Ordering::Equal => return Ok(values[store]),
            core::cmp::Ordering::Less => hi = store,
            core::cmp::Ordering::Greater => lo = store + 1,
        }
    }
}

/// Arithmetic mean of a non-empty slice.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased (n − 1 denominator) sample standard deviation.
///
/// Returns `0.0` for slices with fewer than two elements.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|&v| (v - m) * (v - m)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}
