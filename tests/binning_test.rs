//! Block-averaging estimator properties and derived response functions.

use xymc::binning::{binned_estimate, specific_heat, susceptibility, BinnedEstimate};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

#[test]
fn mean_is_finite_and_sem_nonnegative_for_any_length() {
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    for len in [1usize, 2, 5, 9, 10, 11, 37, 100, 1000] {
        for target in [1usize, 3, 10] {
            let samples: Vec<f64> = (0..len).map(|_| rng.gen_range(-2.0..2.0)).collect();
            let est = binned_estimate(&samples, target);
            assert!(
                est.mean.is_finite(),
                "mean not finite for len={len} target={target}"
            );
            assert!(
                est.sem >= 0.0 && est.sem.is_finite(),
                "bad SEM for len={len} target={target}"
            );
            assert!(est.bins >= 1);
        }
    }
}

#[test]
fn sem_is_zero_when_all_bin_means_agree() {
    let samples = vec![0.75; 40];
    let est = binned_estimate(&samples, 10);
    assert_eq!(est.mean, 0.75);
    assert_eq!(est.sem, 0.0);
    assert_eq!(est.bins, 10);
}

#[test]
fn short_series_degrade_to_single_sample_bins() {
    // 4 samples against a target of 10: every sample becomes its own bin.
    let est = binned_estimate(&[1.0, 2.0, 3.0, 4.0], 10);
    assert_eq!(est.bins, 4);
    assert!((est.mean - 2.5).abs() < 1e-12);

    // SEM = sqrt(population variance / n) = sqrt(1.25 / 4)
    let expected_sem = (1.25f64 / 4.0).sqrt();
    assert!((est.sem - expected_sem).abs() < 1e-12);
}

#[test]
fn bin_means_reduce_fluctuation_scale() {
    // Alternating series: bin size 2 flattens it entirely.
    let samples: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
    let est = binned_estimate(&samples, 10);
    assert_eq!(est.bins, 10);
    assert!(est.mean.abs() < 1e-12);
    assert!(est.sem < 1e-12, "paired bins should cancel exactly");
}

#[test]
fn specific_heat_matches_fixture() {
    // <E> = -1.5, <E^2> = 2.3, T = 2 -> C = (2.3 - 2.25) / 4 = 0.0125
    let e = BinnedEstimate {
        mean: -1.5,
        sem: 0.0,
        bins: 10,
    };
    let e2 = BinnedEstimate {
        mean: 2.3,
        sem: 0.0,
        bins: 10,
    };
    let c = specific_heat(&e, &e2, 2.0);
    assert!((c - 0.0125).abs() < 1e-12, "specific heat was {c}");
}

#[test]
fn susceptibility_matches_fluctuation_formula() {
    let m = BinnedEstimate {
        mean: 0.4,
        sem: 0.0,
        bins: 10,
    };
    let m2 = BinnedEstimate {
        mean: 0.25,
        sem: 0.0,
        bins: 10,
    };
    // chi = (0.25 - 0.16) / 1.5
    let chi = susceptibility(&m, &m2, 1.5);
    assert!((chi - 0.09 / 1.5).abs() < 1e-12, "susceptibility was {chi}");
}
