use crate::error::{AppError, Result};
use crate::ml::features::FEATURE_NAMES;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Bumped whenever the on-disk layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

const RISK_MODEL_FILE: &str = "rf_risk.bin";
const SEVERITY_MODEL_FILE: &str = "rf_severity.bin";
const SCALER_FILE: &str = "scaler.bin";
const METRICS_FILE: &str = "metrics.json";

/// What a persisted file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Scaler,
    RiskModel,
    SeverityModel,
}

/// Stored in front of every payload so a scaler and forests from different
/// runs, or a different feature layout, are never paired at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub kind: ArtifactKind,
    pub run_id: Uuid,
    pub feature_names: Vec<String>,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub n_training_samples: usize,
}

impl ArtifactHeader {
    pub fn new(
        kind: ArtifactKind,
        run_id: Uuid,
        trained_at: chrono::DateTime<chrono::Utc>,
        n_training_samples: usize,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            kind,
            run_id,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            trained_at,
            n_training_samples,
        }
    }

    fn check(&self, expected: ArtifactKind, path: &Path) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(AppError::Artifact(format!(
                "{}: format version {} (expected {})",
                path.display(),
                self.format_version,
                ARTIFACT_FORMAT_VERSION
            )));
        }
        if self.kind != expected {
            return Err(AppError::Artifact(format!(
                "{}: holds {:?}, expected {:?}",
                path.display(),
                self.kind,
                expected
            )));
        }
        if self.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(AppError::Artifact(format!(
                "{}: feature schema {:?} does not match {:?}",
                path.display(),
                self.feature_names,
                FEATURE_NAMES
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    header: ArtifactHeader,
    payload: T,
}

/// Locations of the three artifacts inside a model directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub risk_model: PathBuf,
    pub severity_model: PathBuf,
    pub scaler: PathBuf,
    pub metrics: PathBuf,
}

impl ArtifactPaths {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            risk_model: dir.join(RISK_MODEL_FILE),
            severity_model: dir.join(SEVERITY_MODEL_FILE),
            scaler: dir.join(SCALER_FILE),
            metrics: dir.join(METRICS_FILE),
            dir,
        }
    }
}

/// Write `payload` behind `header`, replacing any existing file
pub fn save<T: Serialize>(path: &Path, header: &ArtifactHeader, payload: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    #[derive(Serialize)]
    struct EnvelopeRef<'a, T> {
        header: &'a ArtifactHeader,
        payload: &'a T,
    }

    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, &EnvelopeRef { header, payload }).map_err(|e| {
        AppError::Artifact(format!("Failed to write {}: {}", path.display(), e))
    })?;
    writer.flush()?;

    tracing::debug!(path = %path.display(), kind = ?header.kind, "Saved artifact");
    Ok(())
}

/// Read and validate an artifact of the given kind.
///
/// Decodes from an in-memory slice so every length prefix is checked against
/// the bytes actually present.
pub fn load<T: DeserializeOwned>(path: &Path, kind: ArtifactKind) -> Result<(ArtifactHeader, T)> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::Artifact(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let envelope: Envelope<T> = bincode::deserialize(&bytes).map_err(|e| {
        AppError::Artifact(format!("Failed to decode {}: {}", path.display(), e))
    })?;

    envelope.header.check(kind, path)?;
    Ok((envelope.header, envelope.payload))
}
