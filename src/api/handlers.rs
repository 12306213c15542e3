use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::ml::{FeatureVector, Prediction};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Static readiness message
pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "Fever Risk & Severity Prediction API is running. POST /predict or GET /predict/test."
            .to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub message: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.predictor.status();
    Json(HealthResponse {
        status: if status.models_loaded {
            "ready".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        models_loaded: status.models_loaded,
        run_id: status.run_id,
        detail: status.detail,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub models_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Either a prediction or the soft "models not loaded" error
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ScoreResponse {
    Prediction(Prediction),
    Error { error: String },
}

/// Predict risk and severity for one patient
pub async fn predict(
    State(state): State<AppState>,
    Json(features): Json<FeatureVector>,
) -> Result<Json<ScoreResponse>> {
    score(&state, &features)
}

/// Score the built-in sample vector
pub async fn predict_test(State(state): State<AppState>) -> Result<Json<ScoreResponse>> {
    score(&state, &FeatureVector::sample())
}

fn score(state: &AppState, features: &FeatureVector) -> Result<Json<ScoreResponse>> {
    match state.predictor.score(features) {
        Ok(prediction) => {
            tracing::debug!(
                risk = prediction.risk,
                severity = prediction.severity,
                "Scored request"
            );
            Ok(Json(ScoreResponse::Prediction(prediction)))
        }
        // Unloaded models are reported in-band so clients always get a body
        Err(AppError::ModelsUnavailable(message)) => {
            Ok(Json(ScoreResponse::Error { error: message }))
        }
        Err(e) => Err(e),
    }
}
