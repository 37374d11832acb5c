//! The coupled simulated annealing optimizer.
//!
//! Drives a fixed-size population of hyperparameter configurations (the
//! energy landscape) through mutate/accept/reject cycles under a cooling
//! schedule, calling the energy function once per candidate per iteration.
//! The per-iteration state is threaded as an immutable record; the landscape
//! snapshot an iteration starts from is always fully resolved.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{Configuration, Landscape, LandscapePoint};
use crate::energy::{EnergyFunction, FnEnergy};
use crate::error::{Error, Result};
use crate::prior::{prior_penalty, HyperPrior};
use crate::variant::Variant;

/// Mutation temperature at countdown index `k`: `t0 / k`.
///
/// Strictly decreasing in `k` for any positive `t0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mutation_temperature(t0: f64, k: usize) -> f64 {
    t0 / k as f64
}

/// Log-schedule acceptance temperature at countdown index `k`:
/// `t0 / ln(k + 1)`.
///
/// Used by every variant except `MwVC`, whose acceptance temperature follows
/// the variance-controlled update instead.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn acceptance_temperature(t0: f64, k: usize) -> f64 {
    t0 / ((k + 1) as f64).ln()
}

/// A standard Cauchy draw scaled to `scale`, via the inverse CDF.
fn cauchy(rng: &mut StdRng, scale: f64) -> f64 {
    let u: f64 = rng.random();
    scale * (core::f64::consts::PI * (u - 0.5)).tan()
}

/// Population variance of the previous iteration's acceptance probabilities.
#[allow(clippy::cast_precision_loss)]
fn probability_variance(probs: &[f64]) -> f64 {
    let n = probs.len() as f64;
    let mean = probs.iter().sum::<f64>() / n;
    probs.iter().map(|&p| (p - mean) * (p - mean)).sum::<f64>() / n
}

/// The immutable state snapshot threaded through the iteration countdown.
struct IterationState {
    landscape: Landscape,
    /// Per-member acceptance probabilities from the previous iteration.
    acceptance_probs: Vec<f64>,
    /// Acceptance temperature carried forward for the variance-controlled
    /// update.
    acceptance_temp: f64,
}

/// Coupled simulated annealing over an [`EnergyFunction`].
///
/// # Examples
///
/// ```
/// use csanneal::{Configuration, CsaOptimizer, Variant};
///
/// // Synthetic landscape: energy is minimized at x = 2.
/// let optimizer = CsaOptimizer::from_fn(|c: &Configuration| {
///     let x = c.get("x").unwrap_or(0.0);
///     Ok((x - 2.0).powi(2))
/// })
/// .variant(Variant::MuSa)
/// .grid_size(6)
/// .max_iterations(25)
/// .seed(42)
/// .build()
/// .unwrap();
///
/// let landscape = optimizer
///     .optimize(&Configuration::from_iter([("x", 5.0)]))
///     .unwrap();
/// let best = landscape.best().unwrap();
/// assert!(best.energy < (5.0_f64 - 2.0).powi(2));
/// ```
pub struct CsaOptimizer<E: EnergyFunction> {
    energy: E,
    variant: Variant,
    grid_size: usize,
    max_iterations: usize,
    initial_temperature: f64,
    alpha: f64,
    priors: HashMap<String, HyperPrior>,
    seed: Option<u64>,
}

/// Builder for [`CsaOptimizer`].
///
/// Defaults: variant `MuSA`, grid size 5, 10 iterations, initial temperature
/// 1.0, `alpha` 0.05, no priors, random seed.
pub struct CsaOptimizerBuilder<E: EnergyFunction> {
    energy: E,
    variant: Variant,
    grid_size: usize,
    max_iterations: usize,
    initial_temperature: f64,
    alpha: f64,
    priors: HashMap<String, HyperPrior>,
    seed: Option<u64>,
}

impl<E: EnergyFunction> CsaOptimizerBuilder<E> {
    /// Sets the annealing variant.
    #[must_use]
    pub fn variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Sets the annealing variant from its tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariant`] for an unrecognized tag.
    pub fn variant_tag(mut self, tag: &str) -> Result<Self> {
        self.variant = tag.parse()?;
        Ok(self)
    }

    /// Sets the landscape (population) size.
    #[must_use]
    pub fn grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Sets the iteration budget. Zero returns the initial landscape.
    #[must_use]
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the initial temperature `t0` of both schedules.
    #[must_use]
    pub fn initial_temperature(mut self, t0: f64) -> Self {
        self.initial_temperature = t0;
        self
    }

    /// Sets the variance-control step factor used by `MwVC`.
    #[must_use]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Attaches a prior to one hyperparameter.
    ///
    /// The prior penalty is only applied once every hyperparameter key has a
    /// prior; a partial map contributes nothing.
    #[must_use]
    pub fn prior(mut self, name: impl Into<String>, prior: HyperPrior) -> Self {
        self.priors.insert(name.into(), prior);
        self
    }

    /// Seeds the optimizer RNG for reproducibility.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the optimizer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGridSize`] for an empty landscape request.
    pub fn build(self) -> Result<CsaOptimizer<E>> {
        if self.grid_size == 0 {
            return Err(Error::InvalidGridSize);
        }
        Ok(CsaOptimizer {
            energy: self.energy,
            variant: self.variant,
            grid_size: self.grid_size,
            max_iterations: self.max_iterations,
            initial_temperature: self.initial_temperature,
            alpha: self.alpha,
            priors: self.priors,
            seed: self.seed,
        })
    }
}

impl<F> CsaOptimizer<FnEnergy<F>>
where
    F: Fn(&Configuration) -> Result<f64>,
{
    /// Starts a builder around a plain closure objective.
    #[must_use]
    pub fn from_fn(f: F) -> CsaOptimizerBuilder<FnEnergy<F>> {
        Self::builder(FnEnergy::new(f))
    }
}

impl<E: EnergyFunction> CsaOptimizer<E> {
    /// Starts a builder around an energy function.
    #[must_use]
    pub fn builder(energy: E) -> CsaOptimizerBuilder<E> {
        CsaOptimizerBuilder {
            energy,
            variant: Variant::default(),
            grid_size: 5,
            max_iterations: 10,
            initial_temperature: 1.0,
            alpha: 0.05,
            priors: HashMap::new(),
            seed: None,
        }
    }

    /// Runs the full annealing countdown from an initial configuration and
    /// returns the final landscape. The caller extracts the optimum with
    /// [`Landscape::best`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyConfiguration`] for an initial configuration
    /// without hyperparameters, and propagates the first energy-function
    /// failure; no partial landscape is salvaged.
    pub fn optimize(&self, initial: &Configuration) -> Result<Landscape> {
        if initial.is_empty() {
            return Err(Error::EmptyConfiguration);
        }

        let mut rng = self
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        let mut state = self.initial_state(initial, &mut rng)?;
        for k in (1..=self.max_iterations).rev() {
            state = self.step(state, k, &mut rng)?;
        }
        Ok(state.landscape)
    }

    /// Builds the initial landscape: member 0 is the initial configuration
    /// itself, the rest are Cauchy mutations of it at temperature `t0`.
    fn initial_state(&self, initial: &Configuration, rng: &mut StdRng) -> Result<IterationState> {
        let t0 = self.initial_temperature;

        let mut points = Vec::with_capacity(self.grid_size);
        for i in 0..self.grid_size {
            let config = if i == 0 {
                initial.clone()
            } else {
                self.mutate(initial, t0, rng)
            };
            let energy = self.penalized_energy(&config)?;
            points.push(LandscapePoint { energy, config });
        }
        let landscape = Landscape::new(points);

        // Initial coupling and per-member acceptance probabilities, evaluated
        // at t0; they feed the first variance check of the MwVC schedule.
        let max_e = landscape.max_energy().unwrap_or(0.0);
        let shifted: Vec<f64> = landscape.energies().into_iter().map(|e| e - max_e).collect();
        let gamma = self.variant.coupling_factor(&shifted, t0);
        let acceptance_probs = shifted
            .iter()
            .map(|&e| self.variant.acceptance_probability(e, e, gamma, t0))
            .collect();

        trace_info!(
            grid_size = self.grid_size,
            variant = %self.variant,
            "landscape initialized"
        );
        Ok(IterationState {
            landscape,
            acceptance_probs,
            acceptance_temp: t0,
        })
    }

    /// One annealing iteration at countdown index `k`.
    fn step(&self, state: IterationState, k: usize, rng: &mut StdRng) -> Result<IterationState> {
        let t0 = self.initial_temperature;
        let t_mut = mutation_temperature(t0, k);
        let t_acc = if self.variant.variance_controlled() {
            let sigma_d = self.variant.desired_variance(self.grid_size);
            if probability_variance(&state.acceptance_probs) < sigma_d {
                state.acceptance_temp * (1.0 - self.alpha)
            } else {
                state.acceptance_temp * (1.0 + self.alpha)
            }
        } else {
            acceptance_temperature(t0, k)
        };

        let max_e = state.landscape.max_energy().unwrap_or(0.0);
        let shifted: Vec<f64> = state
            .landscape
            .energies()
            .into_iter()
            .map(|e| e - max_e)
            .collect();
        let gamma = self.variant.coupling_factor(&shifted, t_acc);

        // Members evolve independently against the frozen temperature and
        // coupling values computed above.
        let mut points = Vec::with_capacity(state.landscape.len());
        let mut acceptance_probs = Vec::with_capacity(state.landscape.len());
        let mut accepted = 0_usize;
        for (member, &shifted_old) in state.landscape.iter().zip(shifted.iter()) {
            let candidate = self.mutate(&member.config, t_mut, rng);
            let candidate_energy = self.penalized_energy(&candidate)?;

            let p = self.variant.acceptance_probability(
                candidate_energy - max_e,
                shifted_old,
                gamma,
                t_acc,
            );
            let accept = candidate_energy < member.energy || rng.random::<f64>() < p;

            if accept {
                accepted += 1;
                points.push(LandscapePoint {
                    energy: candidate_energy,
                    config: candidate,
                });
            } else {
                points.push(member.clone());
            }
            acceptance_probs.push(p);
        }

        trace_info!(k, t_mut, t_acc, accepted, "iteration complete");
        Ok(IterationState {
            landscape: Landscape::new(points),
            acceptance_probs,
            acceptance_temp: t_acc,
        })
    }

    /// Mutates every hyperparameter with i.i.d. Cauchy noise at scale `t`,
    /// constrained non-negative by taking the absolute value.
    fn mutate(&self, config: &Configuration, t: f64, rng: &mut StdRng) -> Configuration {
        config.map_values(|_, v| (v + cauchy(rng, t)).abs())
    }

    /// Raw energy plus the prior penalty (zero unless every hyperparameter
    /// has a prior).
    fn penalized_energy(&self, config: &Configuration) -> Result<f64> {
        let raw = self.energy.energy(config)?;
        Ok(raw + prior_penalty(config, &self.priors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(config: &Configuration) -> Result<f64> {
        let x = config.get("x").ok_or(Error::EmptyConfiguration)?;
        let y = config.get("y").unwrap_or(1.0);
        Ok((x - 2.0).powi(2) + (y - 1.0).powi(2))
    }

    #[test]
    fn temperatures_strictly_decrease_in_k() {
        for k in 1..200 {
            assert!(mutation_temperature(1.5, k) > mutation_temperature(1.5, k + 1));
            assert!(acceptance_temperature(1.5, k) > acceptance_temperature(1.5, k + 1));
        }
    }

    #[test]
    fn zero_grid_size_fails_at_construction() {
        let result = CsaOptimizer::from_fn(quadratic).grid_size(0).build();
        assert!(matches!(result, Err(Error::InvalidGridSize)));
    }

    #[test]
    fn empty_initial_configuration_fails_fast() {
        let optimizer = CsaOptimizer::from_fn(quadratic).seed(1).build().unwrap();
        assert!(matches!(
            optimizer.optimize(&Configuration::new()),
            Err(Error::EmptyConfiguration)
        ));
    }

    #[test]
    fn zero_iterations_returns_initial_landscape() {
        let optimizer = CsaOptimizer::from_fn(quadratic)
            .grid_size(4)
            .max_iterations(0)
            .seed(11)
            .build()
            .unwrap();
        let initial = Configuration::from_iter([("x", 5.0), ("y", 0.5)]);
        let landscape = optimizer.optimize(&initial).unwrap();

        assert_eq!(landscape.len(), 4);
        // member 0 carries the untouched initial configuration
        assert_eq!(landscape[0].config, initial);
        assert!((landscape[0].energy - quadratic(&initial).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn landscape_length_is_invariant_across_iterations() {
        for &iterations in &[1, 5, 20] {
            let optimizer = CsaOptimizer::from_fn(quadratic)
                .grid_size(7)
                .max_iterations(iterations)
                .seed(3)
                .build()
                .unwrap();
            let landscape = optimizer
                .optimize(&Configuration::from_iter([("x", 4.0), ("y", 4.0)]))
                .unwrap();
            assert_eq!(landscape.len(), 7);
        }
    }

    #[test]
    fn mutation_keeps_hyperparameters_non_negative() {
        let optimizer = CsaOptimizer::from_fn(quadratic).seed(5).build().unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let config = Configuration::from_iter([("x", 0.1), ("y", 0.1)]);
        for _ in 0..200 {
            let mutated = optimizer.mutate(&config, 2.0, &mut rng);
            assert!(mutated.iter().all(|(_, v)| v >= 0.0));
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let initial = Configuration::from_iter([("x", 5.0), ("y", 3.0)]);
        let run = |seed| {
            CsaOptimizer::from_fn(quadratic)
                .grid_size(4)
                .max_iterations(10)
                .seed(seed)
                .build()
                .unwrap()
                .optimize(&initial)
                .unwrap()
        };
        assert_eq!(run(17), run(17));
    }

    #[test]
    fn every_variant_improves_a_quadratic_bowl() {
        let initial = Configuration::from_iter([("x", 8.0), ("y", 8.0)]);
        let initial_energy = quadratic(&initial).unwrap();
        for variant in [
            Variant::MuSa,
            Variant::Ba,
            Variant::M,
            Variant::MwVc,
            Variant::Sa,
        ] {
            let optimizer = CsaOptimizer::from_fn(quadratic)
                .variant(variant)
                .grid_size(8)
                .max_iterations(40)
                .seed(23)
                .build()
                .unwrap();
            let best = optimizer.optimize(&initial).unwrap().best().unwrap().energy;
            assert!(
                best < initial_energy,
                "{variant}: best {best} vs initial {initial_energy}"
            );
        }
    }

    #[test]
    fn full_prior_map_penalizes_energy() {
        let initial = Configuration::from_iter([("x", 2.0), ("y", 1.0)]);
        let plain = CsaOptimizer::from_fn(quadratic)
            .grid_size(1)
            .max_iterations(0)
            .seed(2)
            .build()
            .unwrap();
        let with_priors = CsaOptimizer::from_fn(quadratic)
            .grid_size(1)
            .max_iterations(0)
            .seed(2)
            .prior("x", HyperPrior::Exponential { rate: 1.0 })
            .prior("y", HyperPrior::Exponential { rate: 1.0 })
            .build()
            .unwrap();

        let e_plain = plain.optimize(&initial).unwrap()[0].energy;
        let e_prior = with_priors.optimize(&initial).unwrap()[0].energy;
        // penalty = -ln(e^-2) - ln(e^-1) = 3
        assert!((e_prior - e_plain - 3.0).abs() < 1e-12);
    }
}
