//! Data-source traits consumed by the [`crate::FeatureAssembler`].
//!
//! Each trait covers one upstream system (imagery analysis, elevation
//! model, weather service, fire-history database, site context). A live
//! implementation can be swapped in without touching the scoring core.

use async_trait::async_trait;
use terra_insight_features_models::{
    Coordinates, ElevationGrid, FireHistory, SiteContext, TerrainFeatures, VegetationIndices,
    WeatherConditions,
};

use crate::{FeatureError, indices};

/// Produces vegetation indices for a property from imagery.
#[async_trait]
pub trait VegetationSource: Send + Sync {
    /// Returns vegetation indices for the property.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if the imagery cannot be read or analyzed.
    async fn vegetation(
        &self,
        property_id: &str,
        location: Coordinates,
    ) -> Result<VegetationIndices, FeatureError>;
}

/// Produces terrain attributes from an elevation model.
#[async_trait]
pub trait TerrainSource: Send + Sync {
    /// Returns terrain features at the location.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if the elevation data cannot be read.
    async fn terrain(&self, location: Coordinates) -> Result<TerrainFeatures, FeatureError>;
}

/// Terrain from an elevation tile already clipped to the property area.
#[derive(Debug, Clone)]
pub struct ElevationRaster {
    grid: ElevationGrid,
    mask: Option<Vec<bool>>,
}

impl ElevationRaster {
    #[must_use]
    pub const fn new(grid: ElevationGrid) -> Self {
        Self { grid, mask: None }
    }

    /// Restricts aggregation to cells where `mask` is `true`.
    #[must_use]
    pub fn with_mask(mut self, mask: Vec<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Treats cells equal to `nodata` as missing.
    #[must_use]
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        for value in &mut self.grid.values {
            if (*value - nodata).abs() < f64::EPSILON {
                *value = f64::NAN;
            }
        }
        self
    }
}

#[async_trait]
impl TerrainSource for ElevationRaster {
    async fn terrain(&self, location: Coordinates) -> Result<TerrainFeatures, FeatureError> {
        log::debug!(
            "Deriving terrain at ({}, {}) from a {}x{} elevation raster",
            location.lat,
            location.lon,
            self.grid.rows,
            self.grid.cols
        );
        indices::terrain_features(&self.grid, self.mask.as_deref())
    }
}

/// Looks up current weather.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Returns current weather at the location.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if the weather service fails.
    async fn weather(&self, location: Coordinates) -> Result<WeatherConditions, FeatureError>;
}

/// Looks up historical fires around a location.
#[async_trait]
pub trait FireHistorySource: Send + Sync {
    /// Returns a fire-history summary within `radius_km` of the location.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if the history database fails.
    async fn fire_history(
        &self,
        location: Coordinates,
        radius_km: f64,
    ) -> Result<FireHistory, FeatureError>;
}

/// Looks up road, water, drought and population context.
#[async_trait]
pub trait SiteContextSource: Send + Sync {
    /// Returns site context at the location.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if any underlying dataset fails.
    async fn site_context(&self, location: Coordinates) -> Result<SiteContext, FeatureError>;
}

/// Static values served when a data source is not configured.
pub mod defaults {
    use terra_insight_features_models::{
        FireHistory, SiteContext, TerrainFeatures, VegetationIndices, WeatherConditions,
    };

    /// Vegetation indices.
    pub const VEGETATION: VegetationIndices = VegetationIndices {
        ndvi: 0.65,
        ndmi: 0.45,
        fuel_moisture: 25.0,
        vegetation_cover: None,
    };

    /// Terrain features.
    pub const TERRAIN: TerrainFeatures = TerrainFeatures {
        elevation: 500.0,
        slope: 15.0,
        aspect: 180.0,
        terrain_ruggedness: None,
    };

    /// Current weather.
    pub const WEATHER: WeatherConditions = WeatherConditions {
        temperature: 28.5,
        humidity: 35.0,
        wind_speed: 15.2,
        wind_direction: 225.0,
        pressure: 1013.25,
        days_since_rain: 12,
    };

    /// Fire history.
    pub const FIRE_HISTORY: FireHistory = FireHistory {
        historical_fires: 2,
        avg_fire_size: 150.5,
        last_fire_years_ago: 2.5,
        fire_frequency: 0.6,
    };

    /// Site context.
    pub const SITE_CONTEXT: SiteContext = SiteContext {
        distance_to_road: 2.0,
        distance_to_water: 5.0,
        drought_index: 3.5,
        population_density: 150.0,
    };
}
