/// Integration tests for the training pipeline
///
/// These tests verify:
/// - Synthetic data generation and training with default settings
/// - Determinism of models and metrics for a fixed seed
/// - Persisted artifacts reproduce in-process predictions
/// - Training from a CSV dataset

use fever_risk::ml::{
    train_and_save, ArtifactPaths, Dataset, FeatureVector, LoadedModels, PredictorService,
    Trainer, TrainingConfig,
};
use std::io::Write;

fn config(trees: u16) -> TrainingConfig {
    TrainingConfig {
        risk_trees: trees,
        severity_trees: trees,
        ..TrainingConfig::default()
    }
}

#[test]
fn test_synthetic_path_produces_2000_rows() {
    let trainer = Trainer::new(TrainingConfig::default());
    let dataset = trainer.load_dataset().unwrap();
    assert_eq!(dataset.n_samples(), 2000);

    let trained = Trainer::new(config(10)).train(&dataset).unwrap();
    assert_eq!(trained.metrics.n_train, 1600);
    assert_eq!(trained.metrics.n_test, 400);
}

#[test]
fn test_default_forest_sizes_train() {
    let trained = Trainer::new(TrainingConfig::default()).run().unwrap();

    assert_eq!(trained.risk_model.n_trees(), 200);
    assert_eq!(trained.severity_model.n_trees(), 300);
    // Risk is a deterministic rule over three inputs, a forest recovers it easily
    assert!(trained.metrics.risk.accuracy > 0.8);
    assert!(trained.metrics.severity.accuracy > 0.5);
}

#[test]
fn test_same_seed_is_bit_identical() {
    let a = Trainer::new(config(20)).run().unwrap();
    let b = Trainer::new(config(20)).run().unwrap();

    assert_eq!(
        bincode::serialize(&a.risk_model).unwrap(),
        bincode::serialize(&b.risk_model).unwrap()
    );
    assert_eq!(
        bincode::serialize(&a.severity_model).unwrap(),
        bincode::serialize(&b.severity_model).unwrap()
    );
    assert_eq!(a.scaler, b.scaler);
    assert_eq!(a.metrics, b.metrics);
}

#[test]
fn test_reloaded_artifacts_reproduce_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let trained = train_and_save(config(25), dir.path()).unwrap();
    let in_process = PredictorService::ready(LoadedModels::from(trained));

    let reloaded = PredictorService::load(&ArtifactPaths::new(dir.path()));
    assert!(reloaded.is_ready());

    let mut inputs = vec![FeatureVector::sample()];
    let dataset = Dataset::synthesize(50, 99).unwrap();
    for row in dataset.features.rows() {
        inputs.push(FeatureVector {
            age: row[0] as i32,
            temperature: row[1],
            heart_rate: row[2] as i32,
            bp_sys: row[3] as i32,
            bp_dia: row[4] as i32,
            oxygen_sat: row[5] as i32,
            symptoms_count: row[6] as i32,
            chronic_conditions: row[7] as i32,
            region_risk_index: row[8],
            days_since_onset: row[9] as i32,
        });
    }

    for input in &inputs {
        let expected = in_process.score(input).unwrap();
        let actual = reloaded.score(input).unwrap();
        assert_eq!(expected, actual);
        assert!(actual.risk <= 1);
        assert!(actual.severity <= 2);
    }
}

#[test]
fn test_retraining_overwrites_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let first = train_and_save(config(5), dir.path()).unwrap();
    let second = train_and_save(config(5), dir.path()).unwrap();

    let models = LoadedModels::load(&ArtifactPaths::new(dir.path())).unwrap();
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(models.run_id(), second.run_id);
}

#[test]
fn test_train_from_csv_dataset() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "age,temperature,heart_rate,bp_sys,bp_dia,oxygen_sat,symptoms_count,chronic_conditions,region_risk_index,days_since_onset,source_dataset"
    )
    .unwrap();

    let synthetic = Dataset::synthesize(120, 5).unwrap();
    for row in synthetic.features.rows() {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(file, "{},fever_diagnosis", cells.join(",")).unwrap();
    }
    file.flush().unwrap();

    let trainer = Trainer::new(TrainingConfig {
        dataset_path: Some(file.path().to_path_buf()),
        ..config(5)
    });
    let dataset = trainer.load_dataset().unwrap();
    assert_eq!(dataset.n_samples(), 120);
    assert_eq!(dataset.risk, synthetic.risk);
    assert_eq!(dataset.severity, synthetic.severity);

    let trained = trainer.train(&dataset).unwrap();
    assert_eq!(trained.metrics.n_test, 24);
}
