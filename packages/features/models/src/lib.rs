#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input and collaborator output types for the wildfire feature assembler.
//!
//! Each data source (imagery analysis, terrain, weather, fire history and
//! site context) produces one of these structs. The assembler merges them
//! with caller-supplied property overrides into a single feature mapping.

use serde::{Deserialize, Serialize};

/// A WGS84 location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Coordinates {
    /// Creates a new coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Caller-supplied property attributes that override collaborator data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyOverrides {
    /// Vegetation density on the parcel (0 to 1).
    pub vegetation_density: f64,
    /// Slope of the parcel; replaces the terrain slope.
    pub slope_percentage: f64,
    /// Distance to the nearest fire station (km).
    pub distance_to_fire_station: f64,
    /// Whether a firebreak is already in place.
    pub has_firebreak: bool,
    /// Parcel size in acres.
    pub property_size_acres: f64,
}

impl Default for PropertyOverrides {
    fn default() -> Self {
        Self {
            vegetation_density: 0.5,
            slope_percentage: 10.0,
            distance_to_fire_station: 5.0,
            has_firebreak: false,
            property_size_acres: 1.0,
        }
    }
}

/// Everything needed to assemble features for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRequest {
    /// Caller's property identifier.
    pub property_id: String,
    /// Property location.
    pub location: Coordinates,
    /// Optional overrides; `None` means collaborator data is used as-is.
    pub overrides: Option<PropertyOverrides>,
}

/// Vegetation indices derived from multispectral imagery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VegetationIndices {
    /// Mean NDVI over the analyzed area.
    pub ndvi: f64,
    /// Mean NDMI over the analyzed area.
    pub ndmi: f64,
    /// Estimated fuel moisture content (%).
    pub fuel_moisture: f64,
    /// Fraction of pixels with NDVI above 0.3, when computed from imagery.
    pub vegetation_cover: Option<f64>,
}

/// Terrain attributes derived from an elevation model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainFeatures {
    /// Mean elevation (m).
    pub elevation: f64,
    /// Mean slope (degrees).
    pub slope: f64,
    /// Mean aspect (degrees).
    pub aspect: f64,
    /// Standard deviation of elevation, when computed from a raster.
    pub terrain_ruggedness: Option<f64>,
}

/// Current weather at a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherConditions {
    /// Air temperature (°C).
    pub temperature: f64,
    /// Relative humidity (%).
    pub humidity: f64,
    /// Wind speed (km/h).
    pub wind_speed: f64,
    /// Wind direction (degrees).
    pub wind_direction: f64,
    /// Surface pressure (hPa).
    pub pressure: f64,
    /// Days since the last measurable rain.
    pub days_since_rain: u32,
}

/// Summary of historical fires around a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireHistory {
    /// Number of recorded fires within the search radius.
    pub historical_fires: u32,
    /// Mean fire size (hectares).
    pub avg_fire_size: f64,
    /// Years since the most recent fire.
    pub last_fire_years_ago: f64,
    /// Fires per year.
    pub fire_frequency: f64,
}

/// Infrastructure and demographic context around a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteContext {
    /// Distance to the nearest road (km).
    pub distance_to_road: f64,
    /// Distance to the nearest water feature (km).
    pub distance_to_water: f64,
    /// Drought monitor index.
    pub drought_index: f64,
    /// People per km².
    pub population_density: f64,
}

/// Reflectance bands needed for vegetation index extraction.
///
/// All bands must have the same number of pixels, in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralBands {
    /// Near-infrared reflectance.
    pub nir: Vec<f64>,
    /// Red reflectance.
    pub red: Vec<f64>,
    /// Short-wave infrared reflectance.
    pub swir: Vec<f64>,
}

/// Row-major elevation raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationGrid {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// `rows * cols` elevation values (m), row-major.
    pub values: Vec<f64>,
}

impl ElevationGrid {
    /// Returns the elevation at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the index is outside the grid.
    #[must_use]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_fill_missing_fields_with_schema_defaults() {
        let parsed: PropertyOverrides =
            serde_json::from_str(r#"{"slope_percentage": 25.0}"#).unwrap();
        assert!((parsed.slope_percentage - 25.0).abs() < f64::EPSILON);
        assert!((parsed.vegetation_density - 0.5).abs() < f64::EPSILON);
        assert!((parsed.distance_to_fire_station - 5.0).abs() < f64::EPSILON);
        assert!(!parsed.has_firebreak);
        assert!((parsed.property_size_acres - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn elevation_grid_is_row_major() {
        let grid = ElevationGrid {
            rows: 2,
            cols: 3,
            values: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        };
        assert!((grid.at(0, 2) - 3.0).abs() < f64::EPSILON);
        assert!((grid.at(1, 0) - 4.0).abs() < f64::EPSILON);
    }
}
