use crate::error::{AppError, Result};
use crate::ml::artifacts::{self, ArtifactHeader, ArtifactKind, ArtifactPaths};
use crate::ml::classifier::{Classifier, ForestClassifier};
use crate::ml::dataset::Dataset;
use crate::ml::metrics::ModelMetrics;
use crate::ml::models::{ClassLabel, RiskLevel, ScalerFit, SeverityLevel, TrainingConfig};
use crate::ml::scaler::StandardScaler;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::EnumCount;
use tracing::{info, warn};
use uuid::Uuid;

/// Held-out evaluation of both models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub risk: ModelMetrics,
    pub severity: ModelMetrics,
    pub n_train: usize,
    pub n_test: usize,
}

/// Everything one training run produces
pub struct TrainedModels {
    pub run_id: Uuid,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub scaler: StandardScaler,
    pub risk_model: ForestClassifier,
    pub severity_model: ForestClassifier,
    pub metrics: TrainingMetrics,
}

impl TrainedModels {
    /// Write the scaler, both forests and the metrics report
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        let n_train = self.metrics.n_train;
        let header =
            |kind| ArtifactHeader::new(kind, self.run_id, self.trained_at, n_train);

        artifacts::save(&paths.scaler, &header(ArtifactKind::Scaler), &self.scaler)?;
        artifacts::save(
            &paths.risk_model,
            &header(ArtifactKind::RiskModel),
            &self.risk_model,
        )?;
        artifacts::save(
            &paths.severity_model,
            &header(ArtifactKind::SeverityModel),
            &self.severity_model,
        )?;

        let report = serde_json::to_vec_pretty(&self.metrics)?;
        std::fs::write(&paths.metrics, report)?;

        info!(
            dir = %paths.dir.display(),
            run_id = %self.run_id,
            "💾 Models saved"
        );
        Ok(())
    }
}

/// Offline trainer for the risk and severity forests
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Load the configured dataset, or synthesize one when none is configured.
    ///
    /// A configured path that cannot be read is an error.
    pub fn load_dataset(&self) -> Result<Dataset> {
        match &self.config.dataset_path {
            Some(path) => Dataset::from_csv(path),
            None => {
                info!(
                    rows = self.config.synthetic_rows,
                    "No dataset configured, generating synthetic data"
                );
                Dataset::synthesize(self.config.synthetic_rows, self.config.seed)
            }
        }
    }

    /// Load (or synthesize) data, then fit and evaluate both models
    pub fn run(&self) -> Result<TrainedModels> {
        let dataset = self.load_dataset()?;
        self.train(&dataset)
    }

    /// Fit the scaler and both forests on `dataset`
    pub fn train(&self, dataset: &Dataset) -> Result<TrainedModels> {
        let seed = self.config.seed;
        let split = dataset.split_indices(self.config.test_size, seed)?;
        let train = dataset.select(&split.train);
        let test = dataset.select(&split.test);

        info!(
            n_train = train.n_samples(),
            n_test = test.n_samples(),
            scaler_fit = ?self.config.scaler_fit,
            "Training models"
        );

        let mut scaler = StandardScaler::new();
        match self.config.scaler_fit {
            ScalerFit::TrainSplit => scaler.fit(&train.features)?,
            ScalerFit::FullDataset => scaler.fit(&dataset.features)?,
        }
        let x_train = scaler.transform(&train.features)?;
        let x_test = scaler.transform(&test.features)?;

        let mut risk_model = ForestClassifier::new(RiskLevel::COUNT, self.config.risk_trees, seed);
        risk_model.fit(&x_train, &train.risk)?;
        info!(trees = self.config.risk_trees, "✅ Risk forest trained");

        let mut severity_model =
            ForestClassifier::new(SeverityLevel::COUNT, self.config.severity_trees, seed);
        severity_model.fit(&x_train, &train.severity)?;
        info!(trees = self.config.severity_trees, "✅ Severity forest trained");

        let metrics = if test.n_samples() > 0 {
            TrainingMetrics {
                risk: risk_model.evaluate(&x_test, &test.risk, &RiskLevel::class_names())?,
                severity: severity_model.evaluate(
                    &x_test,
                    &test.severity,
                    &SeverityLevel::class_names(),
                )?,
                n_train: train.n_samples(),
                n_test: test.n_samples(),
            }
        } else {
            warn!("Empty test split, metrics are not meaningful");
            TrainingMetrics {
                risk: ModelMetrics::calculate(&[], &[], &RiskLevel::class_names()),
                severity: ModelMetrics::calculate(&[], &[], &SeverityLevel::class_names()),
                n_train: train.n_samples(),
                n_test: 0,
            }
        };

        info!(
            risk_accuracy = metrics.risk.accuracy,
            severity_accuracy = metrics.severity.accuracy,
            "Evaluation complete"
        );

        Ok(TrainedModels {
            run_id: Uuid::new_v4(),
            trained_at: chrono::Utc::now(),
            scaler,
            risk_model,
            severity_model,
            metrics,
        })
    }
}

/// Train with `config` and persist the artifacts under `model_dir`
pub fn train_and_save(config: TrainingConfig, model_dir: &Path) -> Result<TrainedModels> {
    if config.risk_trees == 0 || config.severity_trees == 0 {
        return Err(AppError::Validation(
            "Forests need at least one tree".to_string(),
        ));
    }

    let trained = Trainer::new(config).run()?;
    trained.save(&ArtifactPaths::new(model_dir))?;
    Ok(trained)
}
