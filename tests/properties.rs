//! Property tests for sampling and chunk planning.

use delinquency_ensemble::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_sample_size_is_rounded_fraction(p in 1usize..2_000, frac in 0.0001f64..=1.0, seed in any::<u64>()) {
        let population = Population::new((0..p).map(|i| format!("E{}", i))).unwrap();
        let mut rng = RandomSource::with_seed(seed);

        let sample = EntitySampler.sample(&population, frac, &mut rng).unwrap();
        prop_assert_eq!(sample.len(), (frac * p as f64).round() as usize);
        prop_assert!(sample.draws().iter().all(|e| population.contains(e)));
    }

    #[test]
    fn prop_chunks_cover_rows_exactly_once(total in 0usize..20_000, chunk in 1usize..3_000) {
        let plan = ChunkPlan::new(total, chunk).unwrap();
        let ranges = plan.ranges();

        prop_assert_eq!(ranges.iter().map(|r| r.length).sum::<usize>(), total);
        prop_assert_eq!(ranges.len(), plan.len());
        let mut expected_offset = 0;
        for range in &ranges {
            prop_assert_eq!(range.offset, expected_offset);
            prop_assert!(range.length >= 1 && range.length <= chunk);
            expected_offset = range.end();
        }
        if total % chunk != 0 {
            prop_assert_eq!(ranges.last().map(|r| r.length), Some(total % chunk));
        }
        // Restartable
        prop_assert_eq!(plan.ranges(), ranges);
    }

    #[test]
    fn prop_invalid_fraction_is_rejected(frac in prop_oneof![-10.0f64..=0.0, 1.0001f64..10.0]) {
        let population = Population::new(["A", "B"].iter().map(|s| s.to_string())).unwrap();
        let mut rng = RandomSource::with_seed(0);
        let result = EntitySampler.sample(&population, frac, &mut rng);
        prop_assert!(
            matches!(result, Err(PipelineError::InvalidParameter { .. })),
            "fraction {} was accepted",
            frac
        );
    }
}

#[test]
fn test_samples_are_subsets_of_population() {
    let population = Population::new((0..100).map(|i| format!("L{}", i))).unwrap();
    let mut rng = RandomSource::with_seed(2024);

    for _ in 0..1000 {
        let sample = EntitySampler.sample(&population, 0.5, &mut rng).unwrap();
        assert_eq!(sample.len(), 50);
        assert!(sample.distinct().iter().all(|e| population.contains(e)));
    }
}

#[test]
fn test_plan_for_250_rows() {
    let plan = ChunkPlan::new(250, 100).unwrap();
    assert_eq!(
        plan.ranges(),
        vec![
            ChunkRange::new(0, 100),
            ChunkRange::new(100, 100),
            ChunkRange::new(200, 50)
        ]
    );
    assert!(ChunkPlan::new(0, 100).unwrap().ranges().is_empty());
}
