use crate::error::{AppError, Result};
use crate::ml::artifacts::{self, ArtifactKind, ArtifactPaths};
use crate::ml::classifier::{Classifier, ForestClassifier};
use crate::ml::features::{FeatureVector, N_FEATURES};
use crate::ml::models::{ClassLabel, Prediction, RiskLevel, SeverityLevel};
use crate::ml::scaler::StandardScaler;
use crate::ml::trainer::TrainedModels;
use ndarray::Array2;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

/// Message returned per request while no models are loaded
pub const MODELS_NOT_LOADED: &str =
    "Models not loaded. Ensure models/rf_risk.bin, models/rf_severity.bin and models/scaler.bin exist.";

/// Fitted scaler plus both forests from a single training run
pub struct LoadedModels {
    run_id: Uuid,
    scaler: StandardScaler,
    risk_model: ForestClassifier,
    severity_model: ForestClassifier,
}

impl LoadedModels {
    /// Read all three artifacts and make sure they belong together
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let (scaler_header, scaler): (_, StandardScaler) =
            artifacts::load(&paths.scaler, ArtifactKind::Scaler)?;
        let (risk_header, risk_model): (_, ForestClassifier) =
            artifacts::load(&paths.risk_model, ArtifactKind::RiskModel)?;
        let (severity_header, severity_model): (_, ForestClassifier) =
            artifacts::load(&paths.severity_model, ArtifactKind::SeverityModel)?;

        let run_id = scaler_header.run_id;
        if risk_header.run_id != run_id || severity_header.run_id != run_id {
            return Err(AppError::Artifact(format!(
                "Artifacts come from different training runs (scaler {}, risk {}, severity {})",
                run_id, risk_header.run_id, severity_header.run_id
            )));
        }

        if scaler.n_features() != N_FEATURES {
            return Err(AppError::Artifact(format!(
                "Scaler expects {} features, service provides {}",
                scaler.n_features(),
                N_FEATURES
            )));
        }
        if !risk_model.is_trained() || !severity_model.is_trained() {
            return Err(AppError::Artifact("Persisted model is not trained".to_string()));
        }

        Ok(Self {
            run_id,
            scaler,
            risk_model,
            severity_model,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn score(&self, features: &FeatureVector) -> Result<Prediction> {
        let row = Array2::from_shape_vec((1, N_FEATURES), features.to_row().to_vec())
            .map_err(|e| AppError::Internal(format!("Failed to create feature array: {}", e)))?;
        let scaled = self.scaler.transform(&row)?;

        let risk_idx = first(self.risk_model.predict(&scaled)?)?;
        let severity_idx = first(self.severity_model.predict(&scaled)?)?;

        let risk = RiskLevel::from_index(risk_idx).ok_or_else(|| {
            AppError::Internal(format!("Risk model returned unknown class {}", risk_idx))
        })?;
        let severity = SeverityLevel::from_index(severity_idx).ok_or_else(|| {
            AppError::Internal(format!(
                "Severity model returned unknown class {}",
                severity_idx
            ))
        })?;

        Ok(Prediction::new(risk, severity))
    }
}

impl From<TrainedModels> for LoadedModels {
    fn from(trained: TrainedModels) -> Self {
        Self {
            run_id: trained.run_id,
            scaler: trained.scaler,
            risk_model: trained.risk_model,
            severity_model: trained.severity_model,
        }
    }
}

fn first(predictions: Vec<usize>) -> Result<usize> {
    predictions
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Internal("Model returned no prediction".to_string()))
}

enum ModelState {
    Ready(LoadedModels),
    Unavailable { reason: String },
}

/// Scoring service built once at startup.
///
/// Never fails to construct: if the artifacts cannot be loaded the service
/// stays up and every `score` call returns [`AppError::ModelsUnavailable`].
pub struct PredictorService {
    state: ModelState,
}

/// Snapshot for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct PredictorStatus {
    pub models_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PredictorService {
    /// Load artifacts from `paths`, degrading instead of failing
    pub fn load(paths: &ArtifactPaths) -> Self {
        match LoadedModels::load(paths) {
            Ok(models) => {
                info!(
                    dir = %paths.dir.display(),
                    run_id = %models.run_id,
                    "✅ Models loaded"
                );
                Self::ready(models)
            }
            Err(e) => {
                error!("Model loading error: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn ready(models: LoadedModels) -> Self {
        Self {
            state: ModelState::Ready(models),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    pub fn status(&self) -> PredictorStatus {
        match &self.state {
            ModelState::Ready(models) => PredictorStatus {
                models_loaded: true,
                run_id: Some(models.run_id),
                detail: None,
            },
            ModelState::Unavailable { reason } => PredictorStatus {
                models_loaded: false,
                run_id: None,
                detail: Some(reason.clone()),
            },
        }
    }

    /// Map one feature vector to risk and severity
    pub fn score(&self, features: &FeatureVector) -> Result<Prediction> {
        match &self.state {
            ModelState::Ready(models) => models.score(features),
            ModelState::Unavailable { .. } => {
                Err(AppError::ModelsUnavailable(MODELS_NOT_LOADED.to_string()))
            }
        }
    }
}
