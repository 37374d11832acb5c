//! Integration tests for the prototype-selection and low-rank approximation
//! pipeline.

use csanneal::{girolami_retains, Dataset, FeatureMap, Kernel, WeightedKde};
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn ring_dataset(n: usize) -> Dataset {
    #[allow(clippy::cast_precision_loss)]
    let features: Vec<_> = (0..n)
        .map(|i| {
            let t = (i as f64) / (n as f64) * core::f64::consts::TAU;
            DVector::from_vec(vec![t.cos() * 3.0, t.sin() * 3.0])
        })
        .collect();
    Dataset::new(features, vec![0.0; n]).unwrap()
}

#[test]
fn test_selector_feeds_feature_map_end_to_end() {
    let data = ring_dataset(30);
    let kde = WeightedKde::silverman(data.features()).unwrap();
    let mut rng = StdRng::seed_from_u64(21);

    let prototypes = csanneal::subset::select(&data, &kde, 8, 100, 1e-9, &mut rng).unwrap();
    assert_eq!(prototypes.len(), 8);

    let map = FeatureMap::build(&prototypes, Kernel::Rbf { bandwidth: 1.0 }, &data.scaler()).unwrap();
    assert!(map.dimension() >= 2);
    assert!(map.dimension() <= 9);

    for x in data.features() {
        let phi = map.project(x);
        assert_eq!(phi.len(), map.dimension());
        assert!((phi[map.dimension() - 1] - 1.0).abs() < 1e-12);
        assert!(phi.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_feature_map_builds_for_every_kernel_family() {
    let data = ring_dataset(16);
    let scaler = data.scaler();
    for tag in [
        "RBF",
        "Polynomial",
        "Exponential",
        "Laplacian",
        "Cauchy",
        "RationalQuadratic",
        "Wave",
    ] {
        let kernel: Kernel = tag.parse().unwrap();
        let map = FeatureMap::build(data.features(), kernel, &scaler);
        // some families may prune aggressively, but a build must either
        // succeed or report an empty map, never panic
        match map {
            Ok(map) => assert!(map.dimension() >= 2, "{tag}"),
            Err(csanneal::Error::EmptyFeatureMap) => {}
            Err(other) => panic!("{tag}: unexpected error {other}"),
        }
    }
}

#[test]
fn test_girolami_threshold_cases_at_m_10() {
    // all mass on one coordinate: l1 = 1, 1 < 20/11 -> rejected
    let mut concentrated = DVector::zeros(10);
    concentrated[4] = 1.0;
    assert!(!girolami_retains(&concentrated, 10));

    // uniform unit eigenvector: l1 = sqrt(10), 10 >= 20/11 -> retained
    let spread = DVector::from_element(10, 1.0 / 10.0_f64.sqrt());
    assert!(girolami_retains(&spread, 10));
}

#[test]
fn test_scaler_round_trip_within_tolerance() {
    let data = ring_dataset(25);
    let scaler = data.scaler();
    for x in data.features() {
        let recovered = scaler.unscale(&scaler.scale(x));
        assert!((x - recovered).norm() < 1e-9);
    }
}
