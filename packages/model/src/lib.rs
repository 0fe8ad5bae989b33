#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Regression model producing the overall wildfire risk score.
//!
//! [`WildfireRiskModel`] pairs a [`network::DenseNetwork`] with the
//! [`scaler::StandardScaler`] learned alongside it. The two are trained,
//! saved and loaded together; inference with one but not the other is
//! refused. Callers depend on the [`RiskModel`] trait so that tests and
//! alternative backends can be injected.

pub mod dataset;
pub mod network;
pub mod persistence;
pub mod scaler;
pub mod training;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dataset::TrainingSample;
use network::DenseNetwork;
use scaler::StandardScaler;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use terra_insight_risk_models::{FeatureMapping, FeatureName, MODEL_FEATURES};
use thiserror::Error;
use training::{EvaluationMetrics, TrainingConfig, TrainingHistory};

/// Version reported for models built by this crate.
pub const MODEL_VERSION: &str = "1.0.0";

/// Seed used to initialize freshly built networks.
pub const DEFAULT_SEED: u64 = 42;

/// Errors that can occur while building, training, persisting or running
/// the model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No normalization parameters are available for inference or saving.
    #[error("Model is not trained: normalization parameters are unavailable")]
    NotTrained,

    /// A vector had the wrong number of features.
    #[error("Expected {expected} features, got {actual}")]
    DimensionMismatch {
        /// Expected width.
        expected: usize,
        /// Actual width.
        actual: usize,
    },

    /// One half of the persisted model/scaler pair is missing.
    #[error("Missing model artifact: {}", path.display())]
    MissingArtifact {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// The persisted model and scaler come from different saves.
    #[error("Model artifact {model_id} does not match scaler artifact {scaler_id}")]
    ArtifactMismatch {
        /// Id stored with the network.
        model_id: String,
        /// Id stored with the scaler.
        scaler_id: String,
    },

    /// The persisted model was trained on a different feature order.
    #[error("Persisted feature order does not match the model feature order")]
    FeatureOrderMismatch,

    /// Not enough data to fit or evaluate.
    #[error("Insufficient data: {message}")]
    InsufficientData {
        /// Description of what went wrong.
        message: String,
    },

    /// Invalid training hyperparameters.
    #[error("Invalid training configuration: {message}")]
    InvalidConfig {
        /// Description of what went wrong.
        message: String,
    },

    /// Training data could not be interpreted.
    #[error("Dataset error: {message}")]
    Dataset {
        /// Description of what went wrong.
        message: String,
    },

    /// Parameters about to be persisted contain NaN or infinity.
    #[error("Refusing to save non-finite {artifact} parameters")]
    NonFiniteParameters {
        /// Which half of the pair is affected.
        artifact: &'static str,
    },

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// How feature vectors are normalized before inference.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NormalizationMode {
    /// Reuse the scaler learned at training time.
    #[default]
    Trained,
    /// Refit the scaler on each single request vector.
    ///
    /// On one sample every feature normalizes to zero, so every request
    /// gets the same score. Kept only to reproduce legacy output.
    PerRequestRefit,
}

/// Provenance and accuracy recorded with a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model version string.
    pub version: String,
    /// Feature order the network was trained on.
    pub feature_names: Vec<FeatureName>,
    /// When training last finished.
    pub trained_at: Option<DateTime<Utc>>,
    /// Validation accuracy of the last training run.
    pub metrics: Option<EvaluationMetrics>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            version: MODEL_VERSION.to_string(),
            feature_names: MODEL_FEATURES.to_vec(),
            trained_at: None,
            metrics: None,
        }
    }
}

/// Description of the serving model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Kind of model.
    pub model_type: String,
    /// Model version string.
    pub version: String,
    /// Ordered input features.
    pub features: Vec<FeatureName>,
    /// Whether normalization parameters are loaded.
    pub trained: bool,
    /// When training last finished.
    pub last_trained: Option<DateTime<Utc>>,
    /// Validation accuracy of the last training run.
    pub accuracy_metrics: Option<EvaluationMetrics>,
    /// Active normalization mode.
    pub normalization: NormalizationMode,
}

/// Produces the overall risk score from a feature mapping.
///
/// Implementations are shared read-only across request handlers.
pub trait RiskModel: Send + Sync {
    /// Predicts the overall risk score in `[0, 100]`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the model or its normalization parameters
    /// are unavailable.
    fn predict(&self, features: &FeatureMapping) -> Result<f64, ModelError>;

    /// Describes the model.
    fn info(&self) -> ModelInfo;
}

/// Dense regression network plus its matched normalization parameters.
#[derive(Debug, Clone)]
pub struct WildfireRiskModel {
    network: DenseNetwork,
    scaler: Option<StandardScaler>,
    metadata: ModelMetadata,
    normalization: NormalizationMode,
}

impl WildfireRiskModel {
    /// Builds a freshly initialized, untrained model.
    #[must_use]
    pub fn build(normalization: NormalizationMode) -> Self {
        log::info!("Model architecture built successfully");
        Self::from_network(
            DenseNetwork::new(MODEL_FEATURES.len(), DEFAULT_SEED),
            normalization,
        )
    }

    /// Wraps an untrained network with a custom architecture.
    ///
    /// # Panics
    ///
    /// Panics if the network does not take [`MODEL_FEATURES`] inputs.
    #[must_use]
    pub fn from_network(network: DenseNetwork, normalization: NormalizationMode) -> Self {
        assert_eq!(
            network.input_size(),
            MODEL_FEATURES.len(),
            "network input size must match the model feature count"
        );
        Self {
            network,
            scaler: None,
            metadata: ModelMetadata::default(),
            normalization,
        }
    }

    /// Loads a matched model/scaler pair from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if either artifact is missing, they do not
    /// match each other, or they were trained on a different feature set.
    pub fn load(dir: &Path, normalization: NormalizationMode) -> Result<Self, ModelError> {
        let (network, scaler, metadata) = persistence::load(dir)?;

        if metadata.feature_names != MODEL_FEATURES {
            return Err(ModelError::FeatureOrderMismatch);
        }
        for width in [network.input_size(), scaler.len(), scaler.scale.len()] {
            if width != MODEL_FEATURES.len() {
                return Err(ModelError::DimensionMismatch {
                    expected: MODEL_FEATURES.len(),
                    actual: width,
                });
            }
        }

        log::info!("Model loaded from {}", dir.display());
        Ok(Self {
            network,
            scaler: Some(scaler),
            metadata,
            normalization,
        })
    }

    /// Loads from `dir` when it exists, otherwise builds a fresh model.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if `dir` exists but does not hold a valid
    /// matched pair.
    pub fn load_or_build(
        dir: Option<&Path>,
        normalization: NormalizationMode,
    ) -> Result<Self, ModelError> {
        match dir {
            Some(dir) if dir.exists() => Self::load(dir, normalization),
            _ => Ok(Self::build(normalization)),
        }
    }

    /// Trains the network and replaces the scaler and metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the data or configuration is unusable.
    pub fn train(
        &mut self,
        samples: &[TrainingSample],
        config: &TrainingConfig,
    ) -> Result<TrainingHistory, ModelError> {
        let outcome = training::fit(&mut self.network, samples, config)?;
        self.scaler = Some(outcome.scaler);
        self.metadata.trained_at = Some(outcome.history.finished_at);
        self.metadata.metrics = Some(outcome.metrics);
        Ok(outcome.history)
    }

    /// Trains a freshly built model on a CSV dataset and saves the result
    /// to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the dataset cannot be loaded, training
    /// fails, or the artifacts cannot be written.
    pub fn train_from_csv(
        data: &Path,
        config: &TrainingConfig,
        output: &Path,
    ) -> Result<(Self, TrainingHistory), ModelError> {
        let samples = dataset::load_csv(data)?;
        let mut model = Self::build(NormalizationMode::Trained);
        let history = model.train(&samples, config)?;
        model.save(output)?;

        if let Some(metrics) = model.metadata.metrics {
            log::info!(
                "Training finished after {} epochs: MAE {:.3}, RMSE {:.3}, R2 {:.3}",
                history.epochs.len(),
                metrics.mae,
                metrics.rmse,
                metrics.r2_score
            );
        }

        Ok((model, history))
    }

    /// Persists the network and scaler to `dir` as a matched pair.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotTrained`] if there is no scaler yet, or an
    /// IO/serialization error.
    pub fn save(&self, dir: &Path) -> Result<(), ModelError> {
        let scaler = self.scaler.as_ref().ok_or(ModelError::NotTrained)?;
        let artifact_id = persistence::save(dir, &self.network, scaler, &self.metadata)?;
        log::info!("Model saved to {} (artifact {artifact_id})", dir.display());
        Ok(())
    }

    /// Whether normalization parameters are available.
    #[must_use]
    pub const fn is_trained(&self) -> bool {
        self.scaler.is_some()
    }

    /// Active normalization mode.
    #[must_use]
    pub const fn normalization(&self) -> NormalizationMode {
        self.normalization
    }

    /// Provenance and accuracy metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Predicts from a raw vector in [`MODEL_FEATURES`] order.
    ///
    /// # Errors
    ///
    /// * [`ModelError::DimensionMismatch`] for a vector of the wrong width
    /// * [`ModelError::NotTrained`] in [`NormalizationMode::Trained`] when
    ///   no scaler is loaded
    pub fn predict_vector(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != MODEL_FEATURES.len() {
            return Err(ModelError::DimensionMismatch {
                expected: MODEL_FEATURES.len(),
                actual: features.len(),
            });
        }

        let normalized = match self.normalization {
            NormalizationMode::Trained => self
                .scaler
                .as_ref()
                .ok_or(ModelError::NotTrained)?
                .transform(features)?,
            NormalizationMode::PerRequestRefit => {
                StandardScaler::fit(&[features.to_vec()])?.transform(features)?
            }
        };

        self.network.predict(&normalized)
    }
}

impl RiskModel for WildfireRiskModel {
    fn predict(&self, features: &FeatureMapping) -> Result<f64, ModelError> {
        self.predict_vector(&features.model_vector())
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            model_type: "Neural Network".to_string(),
            version: self.metadata.version.clone(),
            features: MODEL_FEATURES.to_vec(),
            trained: self.is_trained(),
            last_trained: self.metadata.trained_at,
            accuracy_metrics: self.metadata.metrics,
            normalization: self.normalization,
        }
    }
}
