use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// Trainer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// CSV consumed when present; synthetic data is generated otherwise
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,

    /// Rows to synthesize when no dataset is available
    #[serde(default = "default_synthetic_rows")]
    pub synthetic_rows: usize,

    /// Seed shared by synthesis, the split and both forests
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Held-out fraction (0.0 - 1.0)
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Trees in the risk forest
    #[serde(default = "default_risk_trees")]
    pub risk_trees: u16,

    /// Trees in the severity forest
    #[serde(default = "default_severity_trees")]
    pub severity_trees: u16,

    /// Which rows the scaler statistics come from
    #[serde(default)]
    pub scaler_fit: ScalerFit,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            synthetic_rows: default_synthetic_rows(),
            seed: default_seed(),
            test_size: default_test_size(),
            risk_trees: default_risk_trees(),
            severity_trees: default_severity_trees(),
            scaler_fit: ScalerFit::default(),
        }
    }
}

fn default_synthetic_rows() -> usize {
    2000
}

fn default_seed() -> u64 {
    42
}

fn default_test_size() -> f64 {
    0.2
}

fn default_risk_trees() -> u16 {
    200
}

fn default_severity_trees() -> u16 {
    300
}

/// Scaler fitting scope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScalerFit {
    /// Statistics from the training split only
    #[default]
    TrainSplit,

    /// Statistics from every row, computed before the split
    FullDataset,
}

/// Binary patient urgency
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumCount,
)]
pub enum RiskLevel {
    Low,
    High,
}

/// Ordinal illness intensity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumCount,
)]
pub enum SeverityLevel {
    Mild,
    Moderate,
    Severe,
}

/// Mapping between a label enum and the class index the forests emit
pub trait ClassLabel: Copy + IntoEnumIterator + EnumCount + ToString {
    fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    fn index(self) -> usize;

    fn class_names() -> Vec<String> {
        Self::iter().map(|label| label.to_string()).collect()
    }
}

impl ClassLabel for RiskLevel {
    fn index(self) -> usize {
        self as usize
    }
}

impl ClassLabel for SeverityLevel {
    fn index(self) -> usize {
        self as usize
    }
}

/// Outcome of scoring one feature vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub risk: usize,
    pub risk_label: String,
    pub severity: usize,
    pub severity_label: String,
}

impl Prediction {
    pub fn new(risk: RiskLevel, severity: SeverityLevel) -> Self {
        Self {
            risk: risk.index(),
            risk_label: risk.to_string(),
            severity: severity.index(),
            severity_label: severity.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.synthetic_rows, 2000);
        assert_eq!(config.seed, 42);
        assert_eq!(config.risk_trees, 200);
        assert_eq!(config.severity_trees, 300);
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.scaler_fit, ScalerFit::TrainSplit);
    }

    #[test]
    fn test_label_lookup() {
        assert_eq!(RiskLevel::from_index(0), Some(RiskLevel::Low));
        assert_eq!(RiskLevel::from_index(1), Some(RiskLevel::High));
        assert_eq!(RiskLevel::from_index(2), None);
        assert_eq!(SeverityLevel::from_index(2), Some(SeverityLevel::Severe));
        assert_eq!(SeverityLevel::from_index(3), None);
    }

    #[test]
    fn test_label_text() {
        assert_eq!(RiskLevel::High.to_string(), "High");
        assert_eq!(SeverityLevel::Severe.to_string(), "Severe");
        assert_eq!(
            SeverityLevel::class_names(),
            vec!["Mild", "Moderate", "Severe"]
        );
    }

    #[test]
    fn test_prediction_labels_follow_indices() {
        let prediction = Prediction::new(RiskLevel::High, SeverityLevel::Severe);
        assert_eq!(prediction.risk, 1);
        assert_eq!(prediction.risk_label, "High");
        assert_eq!(prediction.severity, 2);
        assert_eq!(prediction.severity_label, "Severe");

        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["severity_label"], "Severe");
    }

    #[test]
    fn test_scaler_fit_serde() {
        let parsed: ScalerFit = serde_json::from_str("\"full_dataset\"").unwrap();
        assert_eq!(parsed, ScalerFit::FullDataset);
    }
}
