//! Integration tests for bootstrap ensemble training.

use delinquency_ensemble::*;
use polars::prelude::*;
use tempfile::TempDir;

mod common;
use common::*;

/// Four loans A-D with three monthly rows each
fn four_loan_source() -> PolarsSource {
    let ids: Vec<&str> = ["A", "B", "C", "D"]
        .iter()
        .flat_map(|id| std::iter::repeat(*id).take(3))
        .collect();
    let ages: Vec<f64> = (0..12).map(|i| (i % 3) as f64).collect();
    let rates: Vec<f64> = (0..12).map(|i| 3.0 + (i / 3) as f64).collect();
    let labels: Vec<i32> = (0..12).map(|i| (i / 3 >= 2) as i32).collect();
    PolarsSource::from_frame(
        df![
            "LOAN_SEQUENCE_NUMBER" => ids,
            "MONTHLY_REPORTING_PERIOD" => (0..12).map(|i| 202001 + i as i64).collect::<Vec<_>>(),
            "CURRENT_INTEREST_RATE" => rates,
            "LOAN_AGE" => ages,
            "DELINQUENT" => labels,
        ]
        .unwrap(),
    )
}

#[test]
fn test_training_frame_holds_rows_of_sampled_entities() {
    let source = four_loan_source();
    let population = Population::from_source(&source, DEFAULT_ENTITY_COLUMN).unwrap();
    assert_eq!(population.len(), 4);

    let config = ConfigBuilder::new()
        .features(["CURRENT_INTEREST_RATE", "LOAN_AGE"])
        .ensemble_size(1)
        .sample_frac(1.0)
        .build()
        .unwrap();
    let trainer = BootstrapEnsembleTrainer::new(&config).unwrap();

    for seed in 0..20 {
        let mut rng = RandomSource::with_seed(seed);
        let (sample, frame) = trainer.draw_frame(&source, &population, &mut rng).unwrap();

        assert_eq!(sample.len(), 4);
        // Duplicate draws collapse to membership: three rows per distinct loan
        assert_eq!(frame.num_rows(), 3 * sample.distinct().len());
        assert_eq!(frame.num_features(), 2);
    }
}

#[test]
fn test_single_member_ensemble() {
    let source = four_loan_source();
    let population = Population::from_source(&source, DEFAULT_ENTITY_COLUMN).unwrap();
    let config = ConfigBuilder::new()
        .features(["CURRENT_INTEREST_RATE", "LOAN_AGE"])
        .ensemble_size(1)
        .sample_frac(1.0)
        .degenerate_policy(DegeneratePolicy::Resample { max_attempts: 50 })
        .build()
        .unwrap();

    let ensemble = BootstrapEnsembleTrainer::new(&config)
        .unwrap()
        .train(&source, &population)
        .unwrap();
    assert_eq!(ensemble.len(), 1);
}

#[test]
fn test_empty_population() {
    assert!(matches!(
        Population::new(Vec::<String>::new()),
        Err(PipelineError::EmptyPopulation)
    ));

    let empty = PolarsSource::from_frame(create_loan_panel(0, 0, 1));
    assert!(matches!(
        Population::from_source(&empty, DEFAULT_ENTITY_COLUMN),
        Err(PipelineError::EmptyPopulation)
    ));
}

#[test]
fn test_parallel_training_matches_sequential() {
    let source = PolarsSource::from_frame(create_loan_panel(120, 4, 7));
    let mut config = create_test_config(4, 100);

    config.bagging.parallel = false;
    let sequential = train_ensemble(&config, &source);

    config.bagging.parallel = true;
    config.bagging.num_threads = 3;
    let parallel = train_ensemble(&config, &source);

    assert_eq!(sequential.len(), 4);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_members_differ_across_rounds() {
    let source = PolarsSource::from_frame(create_loan_panel(120, 4, 7));
    let ensemble = train_ensemble(&create_test_config(3, 100), &source);

    let members = ensemble.members();
    assert_ne!(members[0], members[1]);
    assert_ne!(members[1], members[2]);
}

#[test]
fn test_ensemble_persistence() {
    let temp_dir = TempDir::new().unwrap();
    let model_path = temp_dir.path().join("ensemble.bin");

    let panel = create_loan_panel(80, 3, 11);
    let source = PolarsSource::from_frame(panel.clone());
    let ensemble = train_ensemble(&create_test_config(2, 100), &source);

    ensemble.save_to_file(&model_path).unwrap();
    let loaded = Ensemble::load_from_file(&model_path).unwrap();
    assert_eq!(loaded, ensemble);

    let before = EnsembleScorer::new(&ensemble).score(&panel).unwrap();
    let after = EnsembleScorer::new(&loaded).score(&panel).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_ensemble_ranks_risky_loans_higher() {
    let panel = create_loan_panel(300, 4, 3);
    let source = PolarsSource::from_frame(panel.clone());
    let mut config = create_test_config(3, 100);
    config.booster.n_estimators = 30;
    let ensemble = train_ensemble(&config, &source);

    let probabilities = EnsembleScorer::new(&ensemble).score(&panel).unwrap();
    let labels = panel
        .column("DELINQUENT")
        .unwrap()
        .as_materialized_series()
        .i32()
        .unwrap()
        .into_no_null_iter()
        .collect::<Vec<_>>();

    let mean = |label: i32| {
        let picked: Vec<f64> = probabilities
            .iter()
            .zip(&labels)
            .filter(|(_, l)| **l == label)
            .map(|(&p, _)| p)
            .collect();
        picked.iter().sum::<f64>() / picked.len() as f64
    };
    assert!(mean(1) > mean(0) + 0.2);
}
