#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature assembly for wildfire risk scoring.
//!
//! The [`FeatureAssembler`] queries each configured data source
//! concurrently, falls back to static defaults for any source that is not
//! configured, and merges the results with caller-supplied property
//! overrides into one [`FeatureMapping`].

pub mod collaborators;
pub mod indices;

use std::sync::Arc;

use collaborators::{
    FireHistorySource, SiteContextSource, TerrainSource, VegetationSource, WeatherSource, defaults,
};
use terra_insight_features_models::PropertyRequest;
use terra_insight_risk_models::{FeatureMapping, FeatureName};
use thiserror::Error;

/// Search radius used for fire-history lookups.
pub const DEFAULT_HISTORY_RADIUS_KM: f64 = 50.0;

/// Vegetation density used when the caller supplies no overrides.
pub const DEFAULT_VEGETATION_DENSITY: f64 = 0.7;

/// Fire-station distance used when the caller supplies no overrides.
pub const DEFAULT_DISTANCE_TO_FIRE_STATION: f64 = 5.0;

/// Errors that can occur while gathering features.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Spectral bands have different pixel counts.
    #[error("Band length mismatch: nir={nir}, red={red}, swir={swir}")]
    BandMismatch {
        /// NIR pixel count.
        nir: usize,
        /// Red pixel count.
        red: usize,
        /// SWIR pixel count.
        swir: usize,
    },

    /// The raster has no usable pixels.
    #[error("Raster contains no usable pixels")]
    EmptyRaster,

    /// The raster dimensions are inconsistent.
    #[error("Invalid raster: {message}")]
    InvalidRaster {
        /// Description of what went wrong.
        message: String,
    },

    /// A data source failed to produce its output.
    #[error("{source_name} lookup failed: {message}")]
    Collaborator {
        /// Which data source failed.
        source_name: &'static str,
        /// Description of what went wrong.
        message: String,
    },
}

/// Merges data-source outputs and property overrides into a feature
/// mapping.
///
/// Every source slot is optional; an empty slot is served from
/// [`collaborators::defaults`].
#[derive(Clone, Default)]
pub struct FeatureAssembler {
    vegetation: Option<Arc<dyn VegetationSource>>,
    terrain: Option<Arc<dyn TerrainSource>>,
    weather: Option<Arc<dyn WeatherSource>>,
    fire_history: Option<Arc<dyn FireHistorySource>>,
    site_context: Option<Arc<dyn SiteContextSource>>,
}

impl FeatureAssembler {
    /// Creates an assembler with no live sources configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `source` for vegetation indices.
    #[must_use]
    pub fn with_vegetation(mut self, source: Arc<dyn VegetationSource>) -> Self {
        self.vegetation = Some(source);
        self
    }

    /// Uses `source` for terrain features.
    #[must_use]
    pub fn with_terrain(mut self, source: Arc<dyn TerrainSource>) -> Self {
        self.terrain = Some(source);
        self
    }

    /// Uses `source` for current weather.
    #[must_use]
    pub fn with_weather(mut self, source: Arc<dyn WeatherSource>) -> Self {
        self.weather = Some(source);
        self
    }

    /// Uses `source` for fire history.
    #[must_use]
    pub fn with_fire_history(mut self, source: Arc<dyn FireHistorySource>) -> Self {
        self.fire_history = Some(source);
        self
    }

    /// Uses `source` for road, water, drought and population context.
    #[must_use]
    pub fn with_site_context(mut self, source: Arc<dyn SiteContextSource>) -> Self {
        self.site_context = Some(source);
        self
    }

    /// Builds the full feature mapping for a property.
    ///
    /// All configured sources are queried concurrently. When overrides are
    /// present, `slope_percentage` replaces the terrain slope.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if any configured source fails.
    pub async fn assemble(&self, request: &PropertyRequest) -> Result<FeatureMapping, FeatureError> {
        let location = request.location;

        let (vegetation, terrain, weather, history, site) = futures::try_join!(
            async {
                match &self.vegetation {
                    Some(source) => source.vegetation(&request.property_id, location).await,
                    None => {
                        log::debug!("No vegetation source configured, using static defaults");
                        Ok(defaults::VEGETATION)
                    }
                }
            },
            async {
                match &self.terrain {
                    Some(source) => source.terrain(location).await,
                    None => Ok(defaults::TERRAIN),
                }
            },
            async {
                match &self.weather {
                    Some(source) => source.weather(location).await,
                    None => Ok(defaults::WEATHER),
                }
            },
            async {
                match &self.fire_history {
                    Some(source) => {
                        source
                            .fire_history(location, DEFAULT_HISTORY_RADIUS_KM)
                            .await
                    }
                    None => Ok(defaults::FIRE_HISTORY),
                }
            },
            async {
                match &self.site_context {
                    Some(source) => source.site_context(location).await,
                    None => Ok(defaults::SITE_CONTEXT),
                }
            },
        )?;

        let slope = request
            .overrides
            .map_or(terrain.slope, |o| o.slope_percentage);
        let vegetation_density = request
            .overrides
            .map_or(DEFAULT_VEGETATION_DENSITY, |o| o.vegetation_density);
        let distance_to_fire_station = request
            .overrides
            .map_or(DEFAULT_DISTANCE_TO_FIRE_STATION, |o| {
                o.distance_to_fire_station
            });

        Ok(FeatureMapping::from_iter([
            (FeatureName::Ndvi, vegetation.ndvi),
            (FeatureName::Ndmi, vegetation.ndmi),
            (FeatureName::Temperature, weather.temperature),
            (FeatureName::Humidity, weather.humidity),
            (FeatureName::WindSpeed, weather.wind_speed),
            (FeatureName::WindDirection, weather.wind_direction),
            (FeatureName::Slope, slope),
            (FeatureName::Aspect, terrain.aspect),
            (FeatureName::Elevation, terrain.elevation),
            (FeatureName::DistanceToRoad, site.distance_to_road),
            (FeatureName::DistanceToWater, site.distance_to_water),
            (FeatureName::FuelMoisture, vegetation.fuel_moisture),
            (FeatureName::DroughtIndex, site.drought_index),
            (FeatureName::DaysSinceRain, f64::from(weather.days_since_rain)),
            (FeatureName::PopulationDensity, site.population_density),
            (
                FeatureName::HistoricalFires,
                f64::from(history.historical_fires),
            ),
            (FeatureName::VegetationDensity, vegetation_density),
            (FeatureName::DistanceToFireStation, distance_to_fire_station),
        ]))
    }
}
