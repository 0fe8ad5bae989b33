#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the wildfire risk server.
//!
//! Risk reports and spread projections are serialized directly from their
//! domain types; the types here only cover the request envelopes and the
//! endpoint-specific wrappers around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use terra_insight_features_models::{
    Coordinates, PropertyOverrides, PropertyRequest, SpectralBands, VegetationIndices,
};
use terra_insight_risk_models::SpreadProjection;

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "TerraInsight AI Service";

/// Epochs used when a training request does not specify any.
pub const DEFAULT_TRAINING_EPOCHS: usize = 100;

/// Estimated wall-clock minutes per training epoch.
pub const MINUTES_PER_EPOCH: f64 = 0.5;

/// Wind speed assumed by the simulation when none is given.
pub const DEFAULT_SIMULATION_WIND_SPEED: f64 = 10.0;

/// Slope assumed by the simulation when none is given.
pub const DEFAULT_SIMULATION_SLOPE: f64 = 10.0;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Always `"healthy"` when the server responds.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Whether trained normalization parameters are loaded.
    pub model_loaded: bool,
    /// Server time of the check.
    pub timestamp: DateTime<Utc>,
}

/// Error body returned with every non-success response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Raw failure message.
    pub detail: String,
}

impl ApiError {
    /// Wraps any displayable failure.
    #[must_use]
    pub fn new(detail: impl std::fmt::Display) -> Self {
        Self {
            detail: detail.to_string(),
        }
    }
}

/// Body of `POST /calculate-risk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCalculationRequest {
    /// Caller's property identifier.
    pub property_id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Optional property characteristics.
    #[serde(default)]
    pub property_data: Option<PropertyOverrides>,
}

impl From<RiskCalculationRequest> for PropertyRequest {
    fn from(request: RiskCalculationRequest) -> Self {
        Self {
            property_id: request.property_id,
            location: Coordinates::new(request.lat, request.lon),
            overrides: request.property_data,
        }
    }
}

/// Body of `POST /analyze-satellite-image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteAnalysisRequest {
    /// Reflectance bands of the imagery covering the property.
    #[serde(flatten)]
    pub bands: SpectralBands,
}

/// Response of `POST /analyze-satellite-image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteAnalysisResponse {
    /// Always `true` on a 200 response.
    pub success: bool,
    /// Indices derived from the bands.
    pub vegetation_indices: VegetationIndices,
    /// When the analysis ran.
    pub analysis_date: DateTime<Utc>,
}

/// Weather inputs of a spread simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationWeather {
    /// Wind speed in km/h.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    /// Wind direction in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f64>,
    /// Air temperature in °C.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Relative humidity in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
}

/// Terrain inputs of a spread simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationTerrain {
    /// Slope in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    /// Elevation in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    /// Aspect in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect: Option<f64>,
}

const fn default_hours() -> u32 {
    24
}

/// Body of `POST /simulate-fire-spread`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireSpreadSimulationRequest {
    /// Ignition point.
    pub start_point: Coordinates,
    #[serde(default)]
    pub weather_conditions: SimulationWeather,
    #[serde(default)]
    pub terrain_data: SimulationTerrain,
    /// Hours to simulate.
    #[serde(default = "default_hours")]
    pub hours: u32,
}

impl FireSpreadSimulationRequest {
    /// Wind speed, or [`DEFAULT_SIMULATION_WIND_SPEED`].
    #[must_use]
    pub fn wind_speed(&self) -> f64 {
        self.weather_conditions
            .wind_speed
            .unwrap_or(DEFAULT_SIMULATION_WIND_SPEED)
    }

    /// Slope, or [`DEFAULT_SIMULATION_SLOPE`].
    #[must_use]
    pub fn slope(&self) -> f64 {
        self.terrain_data.slope.unwrap_or(DEFAULT_SIMULATION_SLOPE)
    }
}

/// Inputs echoed back with a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConditions {
    pub weather: SimulationWeather,
    pub terrain: SimulationTerrain,
}

/// Response of `POST /simulate-fire-spread`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireSpreadSimulationResponse {
    /// `sim_<unix timestamp>`.
    pub simulation_id: String,
    pub start_point: Coordinates,
    /// Hourly samples and total burned area.
    #[serde(flatten)]
    pub projection: SpreadProjection,
    pub conditions: SimulationConditions,
}

impl FireSpreadSimulationResponse {
    /// Wraps a projection computed for `request` at time `now`.
    #[must_use]
    pub fn new(
        request: FireSpreadSimulationRequest,
        projection: SpreadProjection,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            simulation_id: simulation_id(now),
            start_point: request.start_point,
            projection,
            conditions: SimulationConditions {
                weather: request.weather_conditions,
                terrain: request.terrain_data,
            },
        }
    }
}

/// Builds a simulation id from the creation time.
#[must_use]
pub fn simulation_id(now: DateTime<Utc>) -> String {
    format!("sim_{}", now.timestamp())
}

const fn default_epochs() -> usize {
    DEFAULT_TRAINING_EPOCHS
}

/// Query parameters of `POST /train-model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainModelParams {
    /// CSV file with feature columns and `risk_score`.
    pub training_data_path: String,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
}

/// Response of `POST /train-model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainModelResponse {
    /// Always `"training_started"`.
    pub status: String,
    pub epochs: usize,
    pub estimated_time_minutes: f64,
}

impl TrainModelResponse {
    /// Response for a job of `epochs` epochs that has just been started.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn started(epochs: usize) -> Self {
        Self {
            status: "training_started".to_string(),
            epochs,
            estimated_time_minutes: epochs as f64 * MINUTES_PER_EPOCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_request_without_property_data() {
        let request: RiskCalculationRequest =
            serde_json::from_str(r#"{"property_id":"p-1","lat":34.05,"lon":-118.25}"#).unwrap();
        let property: PropertyRequest = request.into();

        assert_eq!(property.property_id, "p-1");
        assert!((property.location.lat - 34.05).abs() < f64::EPSILON);
        assert!(property.overrides.is_none());
    }

    #[test]
    fn partial_property_data_uses_field_defaults() {
        let request: RiskCalculationRequest = serde_json::from_str(
            r#"{"property_id":"p-2","lat":0,"lon":0,"property_data":{"slope_percentage":25}}"#,
        )
        .unwrap();
        let overrides = request.property_data.unwrap();

        assert!((overrides.slope_percentage - 25.0).abs() < f64::EPSILON);
        assert!((overrides.vegetation_density - 0.5).abs() < f64::EPSILON);
        assert!(!overrides.has_firebreak);
    }

    #[test]
    fn simulation_request_defaults() {
        let request: FireSpreadSimulationRequest =
            serde_json::from_str(r#"{"start_point":{"lat":1.0,"lon":2.0}}"#).unwrap();

        assert_eq!(request.hours, 24);
        assert!((request.wind_speed() - 10.0).abs() < f64::EPSILON);
        assert!((request.slope() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn simulation_id_uses_unix_seconds() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(simulation_id(now), "sim_1700000000");
    }

    #[test]
    fn training_estimate_is_half_a_minute_per_epoch() {
        let response = TrainModelResponse::started(100);
        assert!((response.estimated_time_minutes - 50.0).abs() < f64::EPSILON);
        assert_eq!(response.status, "training_started");
    }

    #[test]
    fn satellite_request_reads_flat_bands() {
        let request: SatelliteAnalysisRequest =
            serde_json::from_str(r#"{"nir":[0.5],"red":[0.1],"swir":[0.2]}"#).unwrap();
        assert_eq!(request.bands.nir, [0.5]);
    }
}
