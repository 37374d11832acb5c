//! Hyperparameter configurations and the energy landscape they populate.

use std::collections::BTreeMap;

/// A named hyperparameter vector: a mapping from hyperparameter name to a
/// real value.
///
/// Keys are stable across one optimization run. A configuration is never
/// mutated once it has been placed in the landscape; every mutation step
/// produces a fresh value via [`Configuration::map_values`].
///
/// # Examples
///
/// ```
/// use csanneal::Configuration;
///
/// let config = Configuration::from_iter([("RegParam", 1.0), ("bandwidth", 2.0)]);
/// assert_eq!(config.get("bandwidth"), Some(2.0));
/// assert_eq!(config.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Configuration {
    values: BTreeMap<String, f64>,
}

impl Configuration {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of the named hyperparameter, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Sets a hyperparameter value, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Returns the number of hyperparameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the configuration carries no hyperparameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(name, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Iterates over hyperparameter names in key order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns a new configuration with every value transformed by `f`.
    ///
    /// This is the mutation primitive used by the optimizer: the receiver is
    /// left untouched and a fresh configuration is returned.
    #[must_use]
    pub fn map_values(&self, mut f: impl FnMut(&str, f64) -> f64) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|(k, &v)| (k.clone(), f(k, v)))
                .collect(),
        }
    }

    /// Extracts the sub-configuration restricted to `keys`.
    ///
    /// Keys absent from the configuration are silently skipped; the result is
    /// compared with exact structural equality to decide whether a kernel
    /// rebuild is needed.
    #[must_use]
    pub fn subset<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut values = BTreeMap::new();
        for key in keys {
            if let Some(&v) = self.values.get(key) {
                values.insert(key.to_owned(), v);
            }
        }
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<BTreeMap<String, f64>> for Configuration {
    fn from(values: BTreeMap<String, f64>) -> Self {
        Self { values }
    }
}

/// One member of the energy landscape: a configuration together with its
/// current energy (lower is better).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LandscapePoint {
    /// The scalar energy of the configuration, `1 - performance_score` plus
    /// any prior penalty.
    pub energy: f64,
    /// The hyperparameter configuration.
    pub config: Configuration,
}

/// The population of `(energy, configuration)` pairs maintained across
/// annealing iterations.
///
/// The length is fixed for the whole run. An accepted mutation replaces a
/// member in place; a rejection keeps the old member.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Landscape {
    points: Vec<LandscapePoint>,
}

impl Landscape {
    /// Creates a landscape from its members.
    #[must_use]
    pub fn new(points: Vec<LandscapePoint>) -> Self {
        Self { points }
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` when the landscape has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates over the members in population order.
    pub fn iter(&self) -> core::slice::Iter<'_, LandscapePoint> {
        self.points.iter()
    }

    /// Returns the member energies in population order.
    #[must_use]
    pub fn energies(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.energy).collect()
    }

    /// Returns the maximum energy across the landscape.
    ///
    /// Returns `None` for an empty landscape.
    #[must_use]
    pub fn max_energy(&self) -> Option<f64> {
        self.points.iter().map(|p| p.energy).fold(None, |acc, e| {
            Some(acc.map_or(e, |a: f64| a.max(e)))
        })
    }

    /// Returns the minimum-energy member: the optimum a caller extracts from
    /// a finished run.
    #[must_use]
    pub fn best(&self) -> Option<&LandscapePoint> {
        self.points
            .iter()
            .min_by(|a, b| a.energy.total_cmp(&b.energy))
    }
}

impl IntoIterator for Landscape {
    type Item = LandscapePoint;
    type IntoIter = std::vec::IntoIter<LandscapePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a> IntoIterator for &'a Landscape {
    type Item = &'a LandscapePoint;
    type IntoIter = core::slice::Iter<'a, LandscapePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl core::ops::Index<usize> for Landscape {
    type Output = LandscapePoint;

    fn index(&self, index: usize) -> &LandscapePoint {
        &self.points[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_uses_exact_key_match() {
        let config = Configuration::from_iter([("bandwidth", 2.0), ("RegParam", 0.5)]);
        let sub = config.subset(["bandwidth"]);
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.get("bandwidth"), Some(2.0));
        assert_eq!(sub.get("RegParam"), None);
    }

    #[test]
    fn subset_skips_missing_keys() {
        let config = Configuration::from_iter([("bandwidth", 2.0)]);
        let sub = config.subset(["bandwidth", "degree"]);
        assert_eq!(sub.len(), 1);
    }

    #[test]
    fn map_values_leaves_receiver_untouched() {
        let config = Configuration::from_iter([("a", 1.0), ("b", 2.0)]);
        let doubled = config.map_values(|_, v| v * 2.0);
        assert_eq!(config.get("a"), Some(1.0));
        assert_eq!(doubled.get("a"), Some(2.0));
        assert_eq!(doubled.get("b"), Some(4.0));
    }

    #[test]
    fn best_returns_minimum_energy_member() {
        let landscape = Landscape::new(vec![
            LandscapePoint {
                energy: 0.8,
                config: Configuration::from_iter([("a", 1.0)]),
            },
            LandscapePoint {
                energy: 0.3,
                config: Configuration::from_iter([("a", 2.0)]),
            },
            LandscapePoint {
                energy: 0.5,
                config: Configuration::from_iter([("a", 3.0)]),
            },
        ]);
        let best = landscape.best().unwrap();
        assert!((best.energy - 0.3).abs() < 1e-12);
        assert_eq!(best.config.get("a"), Some(2.0));
        assert_eq!(landscape.max_energy(), Some(0.8));
        assert_eq!(landscape.energies(), vec![0.8, 0.3, 0.5]);
    }
}
