//! Common test utilities for delinquency ensemble integration tests.

#![allow(dead_code)]

use delinquency_ensemble::*;
use polars::prelude::*;
use rand::prelude::*;

/// Feature columns of the synthetic loan panel.
pub fn feature_names() -> Vec<String> {
    ["CURRENT_INTEREST_RATE", "LOAN_AGE", "ESTIMATED_LOAN_TO_VALUE"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Create a loan panel of `num_loans` loans observed for `periods` months.
///
/// Delinquency is more likely for high rates and high loan-to-value, so a
/// fitted ensemble ranks risky rows above safe ones.
pub fn create_loan_panel(num_loans: usize, periods: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = num_loans * periods;

    let mut ids = Vec::with_capacity(rows);
    let mut period_keys = Vec::with_capacity(rows);
    let mut rates = Vec::with_capacity(rows);
    let mut ages = Vec::with_capacity(rows);
    let mut ltvs = Vec::with_capacity(rows);
    let mut labels = Vec::with_capacity(rows);

    for loan in 0..num_loans {
        let rate: f64 = rng.gen_range(2.5..8.0);
        let ltv: f64 = rng.gen_range(40.0..110.0);
        for month in 0..periods {
            let risk = (rate - 5.0) * 0.8 + (ltv - 80.0) * 0.05 + rng.gen_range(-1.0..1.0);
            ids.push(format!("F{:08}", loan));
            period_keys.push(202001 + month as i64);
            rates.push(rate);
            ages.push(month as f64);
            // Missing loan-to-value shows up in real panels
            ltvs.push(if rng.gen_bool(0.05) { None } else { Some(ltv) });
            labels.push((risk > 0.5) as i32);
        }
    }

    df![
        "LOAN_SEQUENCE_NUMBER" => ids,
        "MONTHLY_REPORTING_PERIOD" => period_keys,
        "CURRENT_INTEREST_RATE" => rates,
        "LOAN_AGE" => ages,
        "ESTIMATED_LOAN_TO_VALUE" => ltvs,
        "DELINQUENT" => labels,
    ]
    .unwrap()
}

/// A small, fast pipeline configuration over the synthetic panel.
pub fn create_test_config(ensemble_size: usize, chunk_size: usize) -> PipelineConfig {
    ConfigBuilder::new()
        .features(feature_names())
        .n_estimators(10)
        .max_depth(3)
        .ensemble_size(ensemble_size)
        .sample_frac(0.5)
        .seed(42)
        .chunk_size(chunk_size)
        .num_workers(2)
        .table("scores")
        .build()
        .unwrap()
}

/// Train an ensemble on all entities of `source`.
pub fn train_ensemble(config: &PipelineConfig, source: &PolarsSource) -> Ensemble {
    let population = Population::from_source(source, &config.columns.entity).unwrap();
    BootstrapEnsembleTrainer::new(config)
        .unwrap()
        .train(source, &population)
        .unwrap()
}
