/// Risk and severity classification pipeline
///
/// This module provides:
/// - Feature vector layout shared by training and inference
/// - Dataset loading, synthesis and label derivation
/// - Standardization and random-forest classifiers
/// - Versioned artifact persistence
/// - The offline trainer and the online prediction service

pub mod artifacts;
pub mod classifier;
pub mod dataset;
pub mod features;
pub mod metrics;
pub mod models;
pub mod scaler;
pub mod service;
pub mod trainer;

pub use artifacts::{ArtifactHeader, ArtifactKind, ArtifactPaths};
pub use classifier::{Classifier, ForestClassifier};
pub use dataset::Dataset;
pub use features::{FeatureVector, FEATURE_NAMES, N_FEATURES};
pub use metrics::{ClassMetrics, ModelMetrics};
pub use models::{ClassLabel, Prediction, RiskLevel, ScalerFit, SeverityLevel, TrainingConfig};
pub use scaler::StandardScaler;
pub use service::{LoadedModels, PredictorService, PredictorStatus, MODELS_NOT_LOADED};
pub use trainer::{train_and_save, TrainedModels, Trainer, TrainingMetrics};
