#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for wildfire risk scoring.
//!
//! Exposes risk calculation, satellite band analysis, fire-spread
//! simulation, model information and background training over JSON. The
//! serving model is loaded once at startup and shared read-only by every
//! worker; training jobs write new artifacts to the model directory, which
//! are picked up on the next start.

pub mod config;
mod handlers;

use std::{path::PathBuf, sync::Arc};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use config::{ConfigError, ServerConfig};
use terra_insight_features::FeatureAssembler;
use terra_insight_model::{ModelError, NormalizationMode, RiskModel, WildfireRiskModel};
use terra_insight_risk::report::RiskAssessor;
use thiserror::Error;

/// Errors that can stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be read.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The serving model could not be loaded.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// The HTTP server failed to bind or crashed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Gathers property features from the configured data sources.
    pub assembler: FeatureAssembler,
    /// Scores assembled features with the serving model.
    pub assessor: RiskAssessor,
    /// Where training jobs write new artifacts.
    pub model_path: PathBuf,
}

impl AppState {
    /// Creates state around an already constructed model.
    #[must_use]
    pub fn new(model: Arc<dyn RiskModel>, assembler: FeatureAssembler, model_path: PathBuf) -> Self {
        Self {
            assembler,
            assessor: RiskAssessor::new(model),
            model_path,
        }
    }

    /// Loads the serving model from the configured directory, or builds
    /// an untrained one when the directory does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the directory exists but does not hold a
    /// valid model/scaler pair.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ModelError> {
        if config.normalization == NormalizationMode::PerRequestRefit {
            log::warn!(
                "Normalization mode is per_request_refit: every request is normalized on its own and scores will not vary with input"
            );
        }

        let model =
            WildfireRiskModel::load_or_build(Some(&config.model_path), config.normalization)?;
        if !model.is_trained() && config.normalization == NormalizationMode::Trained {
            log::warn!(
                "No trained model at {}; risk calculations will fail until one is trained",
                config.model_path.display()
            );
        }

        Ok(Self::new(
            Arc::new(model),
            FeatureAssembler::default(),
            config.model_path.clone(),
        ))
    }
}

/// Registers every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::health))
        .route("/calculate-risk", web::post().to(handlers::calculate_risk))
        .route(
            "/analyze-satellite-image",
            web::post().to(handlers::analyze_satellite_image),
        )
        .route(
            "/simulate-fire-spread",
            web::post().to(handlers::simulate_fire_spread),
        )
        .route("/model/info", web::get().to(handlers::model_info))
        .route("/train-model", web::post().to(handlers::train_model));
}

fn cors(origins: &[String]) -> Cors {
    if origins.iter().any(|o| o == "*") {
        return Cors::permissive();
    }

    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
}

/// Starts the wildfire risk API server.
///
/// Loads the serving model and starts the Actix-Web HTTP server. The
/// caller provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// * [`ServerError::Model`] if the model directory holds broken artifacts
/// * [`ServerError::Io`] if the HTTP server fails to bind or run
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    log::info!("Loading model from {}...", config.model_path.display());
    let state = web::Data::new(AppState::from_config(&config)?);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    let origins = config.cors_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}

/// Reads [`ServerConfig`] from the environment and starts the server.
///
/// # Errors
///
/// See [`run_server`]; also fails with [`ServerError::Config`] on invalid
/// environment values.
#[allow(clippy::future_not_send)]
pub async fn run_from_env() -> Result<(), ServerError> {
    run_server(ServerConfig::from_env()?).await
}
