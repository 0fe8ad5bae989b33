//! Threshold-ladder component scorers.
//!
//! Each scorer reads a handful of features and returns a score in
//! `[0, 100]`. Features absent from the mapping take the per-scorer
//! defaults below rather than zero.

use terra_insight_risk_models::{FeatureMapping, FeatureName};

/// Upper bound of every component score.
pub const MAX_COMPONENT_SCORE: f64 = 100.0;

/// Vegetation score from NDVI and fuel moisture.
///
/// First matching tier wins.
#[must_use]
pub fn vegetation_risk(features: &FeatureMapping) -> f64 {
    let ndvi = features.get_or(FeatureName::Ndvi, 0.0);
    let fuel_moisture = features.get_or(FeatureName::FuelMoisture, 50.0);

    if ndvi > 0.6 && fuel_moisture < 30.0 {
        80.0
    } else if ndvi > 0.4 && fuel_moisture < 40.0 {
        60.0
    } else if ndvi > 0.2 {
        40.0
    } else {
        20.0
    }
}

/// Fire-weather score: temperature, humidity, wind and dry spell each add
/// up to 25 points.
#[must_use]
pub fn weather_risk(features: &FeatureMapping) -> f64 {
    let temperature = features.get_or(FeatureName::Temperature, 20.0);
    let humidity = features.get_or(FeatureName::Humidity, 50.0);
    let wind_speed = features.get_or(FeatureName::WindSpeed, 0.0);
    let days_since_rain = features.get_or(FeatureName::DaysSinceRain, 0.0);

    let mut score: f64 = 0.0;
    score += ladder(temperature > 30.0, temperature > 25.0, 25.0, 15.0);
    score += ladder(humidity < 30.0, humidity < 40.0, 25.0, 15.0);
    score += ladder(wind_speed > 20.0, wind_speed > 10.0, 25.0, 15.0);
    score += ladder(days_since_rain > 14.0, days_since_rain > 7.0, 25.0, 15.0);

    score.min(MAX_COMPONENT_SCORE)
}

/// Terrain score from slope tier plus a south-facing aspect bonus.
///
/// The highest reachable value is 60; it is clamped like the other
/// scorers all the same.
#[must_use]
pub fn terrain_risk(features: &FeatureMapping) -> f64 {
    let slope = features.get_or(FeatureName::Slope, 0.0);
    let aspect = features.get_or(FeatureName::Aspect, 0.0);

    let mut score: f64 = if slope > 30.0 {
        40.0
    } else if slope > 20.0 {
        25.0
    } else if slope > 10.0 {
        15.0
    } else {
        0.0
    };

    // South-facing, northern hemisphere.
    if (135.0..=225.0).contains(&aspect) {
        score += 20.0;
    }

    score.min(MAX_COMPONENT_SCORE)
}

/// Proximity score from water access, road access and population.
#[must_use]
pub fn proximity_risk(features: &FeatureMapping) -> f64 {
    let distance_to_water = features.get_or(FeatureName::DistanceToWater, 10.0);
    let distance_to_road = features.get_or(FeatureName::DistanceToRoad, 1.0);
    let population_density = features.get_or(FeatureName::PopulationDensity, 100.0);

    let mut score: f64 = 0.0;
    score += ladder(distance_to_water > 5.0, distance_to_water > 2.0, 30.0, 20.0);
    score += ladder(distance_to_road > 5.0, distance_to_road > 2.0, 30.0, 20.0);
    if population_density > 1000.0 {
        score += 20.0;
    }

    score.min(MAX_COMPONENT_SCORE)
}

fn ladder(high: bool, medium: bool, high_points: f64, medium_points: f64) -> f64 {
    if high {
        high_points
    } else if medium {
        medium_points
    } else {
        0.0
    }
}
