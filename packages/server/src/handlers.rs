//! HTTP handler functions for the wildfire risk API.
//!
//! Every failure is answered with a 500 and an [`ApiError`] carrying the
//! raw error message.

use std::{fmt::Display, path::PathBuf};

use actix_web::{HttpResponse, web};
use chrono::Utc;
use terra_insight_features::indices;
use terra_insight_features_models::PropertyRequest;
use terra_insight_model::{WildfireRiskModel, training::TrainingConfig};
use terra_insight_risk::spread;
use terra_insight_server_models::{
    ApiError, ApiHealth, FireSpreadSimulationRequest, FireSpreadSimulationResponse,
    RiskCalculationRequest, SERVICE_NAME, SatelliteAnalysisRequest, SatelliteAnalysisResponse,
    TrainModelParams, TrainModelResponse,
};

use crate::AppState;

fn server_error(context: &str, error: impl Display) -> HttpResponse {
    log::error!("{context}: {error}");
    HttpResponse::InternalServerError().json(ApiError::new(error))
}

/// `GET /`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        model_loaded: state.assessor.model().info().trained,
        timestamp: Utc::now(),
    })
}

/// `POST /calculate-risk`
///
/// Assembles features for the property and returns its risk report.
pub async fn calculate_risk(
    state: web::Data<AppState>,
    body: web::Json<RiskCalculationRequest>,
) -> HttpResponse {
    let request: PropertyRequest = body.into_inner().into();
    log::info!("Calculating risk for property: {}", request.property_id);

    let features = match state.assembler.assemble(&request).await {
        Ok(features) => features,
        Err(e) => return server_error("Error assembling features", e),
    };

    match state.assessor.assess(&features) {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => server_error("Error calculating risk", e),
    }
}

/// `POST /analyze-satellite-image`
///
/// Derives vegetation indices from NIR, red and SWIR bands.
pub async fn analyze_satellite_image(body: web::Json<SatelliteAnalysisRequest>) -> HttpResponse {
    match indices::vegetation_indices(&body.bands) {
        Ok(vegetation_indices) => HttpResponse::Ok().json(SatelliteAnalysisResponse {
            success: true,
            vegetation_indices,
            analysis_date: Utc::now(),
        }),
        Err(e) => server_error("Error analyzing satellite image", e),
    }
}

/// `POST /simulate-fire-spread`
pub async fn simulate_fire_spread(body: web::Json<FireSpreadSimulationRequest>) -> HttpResponse {
    let request = body.into_inner();

    match spread::project_spread(request.wind_speed(), request.slope(), request.hours) {
        Ok(projection) => HttpResponse::Ok().json(FireSpreadSimulationResponse::new(
            request,
            projection,
            Utc::now(),
        )),
        Err(e) => server_error("Error simulating fire spread", e),
    }
}

/// `GET /model/info`
pub async fn model_info(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.assessor.model().info())
}

/// `POST /train-model`
///
/// Starts a background training job on a CSV file and returns
/// immediately. The job writes new artifacts to the model directory; the
/// serving model is left untouched.
pub async fn train_model(
    state: web::Data<AppState>,
    query: web::Query<TrainModelParams>,
) -> HttpResponse {
    let params = query.into_inner();
    let config = TrainingConfig {
        epochs: params.epochs,
        ..TrainingConfig::default()
    };
    if let Err(e) = config.validate() {
        return server_error("Error starting training", e);
    }

    let data = PathBuf::from(&params.training_data_path);
    if !data.is_file() {
        return server_error(
            "Error starting training",
            format!("Training data not found: {}", data.display()),
        );
    }

    let output = state.model_path.clone();
    log::info!(
        "Starting training job: {} epochs on {}",
        params.epochs,
        data.display()
    );

    actix_web::rt::spawn(async move {
        let job = actix_web::rt::task::spawn_blocking(move || {
            WildfireRiskModel::train_from_csv(&data, &config, &output).map(|_| output)
        });
        match job.await {
            Ok(Ok(output)) => log::info!(
                "Training job finished; artifacts written to {}",
                output.display()
            ),
            Ok(Err(e)) => log::error!("Training job failed: {e}"),
            Err(e) => log::error!("Training job aborted: {e}"),
        }
    });

    HttpResponse::Ok().json(TrainModelResponse::started(params.epochs))
}
