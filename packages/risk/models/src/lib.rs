#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for wildfire risk scoring.
//!
//! Defines the named feature mapping that flows from the feature assembler
//! into the heuristic scorers and the regression model, plus the
//! component scores, recommendations, spread estimates and the final
//! risk report returned to callers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Name of a single feature in a [`FeatureMapping`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureName {
    /// Normalized Difference Vegetation Index (-1 to 1)
    Ndvi,
    /// Normalized Difference Moisture Index (-1 to 1)
    Ndmi,
    /// Air temperature (°C)
    Temperature,
    /// Relative humidity (%)
    Humidity,
    /// Wind speed (km/h)
    WindSpeed,
    /// Wind direction (degrees, 0 = North)
    WindDirection,
    /// Terrain slope (degrees or percent, as supplied)
    Slope,
    /// Terrain aspect (degrees, 180 = south-facing)
    Aspect,
    /// Elevation (m)
    Elevation,
    /// Distance to the nearest road (km)
    DistanceToRoad,
    /// Distance to the nearest water source (km)
    DistanceToWater,
    /// Fuel moisture content (%)
    FuelMoisture,
    /// Drought index
    DroughtIndex,
    /// Days since the last measurable rain
    DaysSinceRain,
    /// Population density (people per km²)
    PopulationDensity,
    /// Number of historical fires nearby
    HistoricalFires,
    /// Vegetation density supplied with the property (0 to 1)
    VegetationDensity,
    /// Distance to the nearest fire station (km)
    DistanceToFireStation,
}

impl FeatureName {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Ndvi,
            Self::Ndmi,
            Self::Temperature,
            Self::Humidity,
            Self::WindSpeed,
            Self::WindDirection,
            Self::Slope,
            Self::Aspect,
            Self::Elevation,
            Self::DistanceToRoad,
            Self::DistanceToWater,
            Self::FuelMoisture,
            Self::DroughtIndex,
            Self::DaysSinceRain,
            Self::PopulationDensity,
            Self::HistoricalFires,
            Self::VegetationDensity,
            Self::DistanceToFireStation,
        ]
    }
}

/// Ordered model input features.
///
/// The regression model is trained on vectors in exactly this order, so
/// changing it invalidates every persisted model.
pub const MODEL_FEATURES: [FeatureName; 15] = [
    FeatureName::Ndvi,
    FeatureName::Ndmi,
    FeatureName::Temperature,
    FeatureName::Humidity,
    FeatureName::WindSpeed,
    FeatureName::Slope,
    FeatureName::Aspect,
    FeatureName::Elevation,
    FeatureName::DistanceToRoad,
    FeatureName::DistanceToWater,
    FeatureName::FuelMoisture,
    FeatureName::DroughtIndex,
    FeatureName::DaysSinceRain,
    FeatureName::PopulationDensity,
    FeatureName::HistoricalFires,
];

/// Flat named-feature mapping for a single property assessment.
///
/// Built once per request and discarded after the report is assembled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureMapping {
    values: BTreeMap<FeatureName, f64>,
}

impl FeatureMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: FeatureName, value: f64) -> Self {
        self.values.insert(name, value);
        self
    }

    /// Sets a feature, returning the previous value if any.
    pub fn insert(&mut self, name: FeatureName, value: f64) -> Option<f64> {
        self.values.insert(name, value)
    }

    /// Returns the value of a feature if present.
    #[must_use]
    pub fn get(&self, name: FeatureName) -> Option<f64> {
        self.values.get(&name).copied()
    }

    /// Returns the value of a feature, or `default` when it is missing.
    #[must_use]
    pub fn get_or(&self, name: FeatureName, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    /// Extracts the model input vector in [`MODEL_FEATURES`] order.
    ///
    /// Missing features are filled with `0.0`.
    #[must_use]
    pub fn model_vector(&self) -> Vec<f64> {
        MODEL_FEATURES
            .iter()
            .map(|name| self.get_or(*name, 0.0))
            .collect()
    }

    /// Number of features present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no features are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates features in name order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureName, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(FeatureName, f64)> for FeatureMapping {
    fn from_iter<T: IntoIterator<Item = (FeatureName, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Risk tier derived from the overall risk score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Score below 20
    Minimal,
    /// Score in [20, 40)
    Low,
    /// Score in [40, 60)
    Moderate,
    /// Score in [60, 80)
    High,
    /// Score of 80 or above
    Extreme,
}

impl RiskLevel {
    /// Maps an overall risk score to its tier.
    ///
    /// Each tier is inclusive on its lower bound.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Extreme
        } else if score >= 60.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Moderate
        } else if score >= 20.0 {
            Self::Low
        } else {
            Self::Minimal
        }
    }
}

/// The four independently computed heuristic sub-scores.
///
/// Each lies in `[0, 100]`; they are not normalized to sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    /// NDVI and fuel-moisture driven score.
    pub vegetation_risk: f64,
    /// Temperature, humidity, wind and dry-spell score.
    pub weather_risk: f64,
    /// Slope and aspect score.
    pub terrain_risk: f64,
    /// Water, road access and population score.
    pub proximity_risk: f64,
}

/// Priority of a mitigation recommendation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// Act soon
    High,
    /// Worth scheduling
    Medium,
    /// Optional
    Low,
}

/// A single mitigation action with fixed cost/impact metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// How urgent the action is.
    pub priority: Priority,
    /// Short action name.
    pub action: String,
    /// What the action involves.
    pub description: String,
    /// Estimated cost in currency units.
    pub estimated_cost: u32,
    /// Expected reduction of the risk score, in points.
    pub risk_reduction: u32,
}

/// Single-shot spread estimate embedded in the risk report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadEstimate {
    /// Estimated spread rate (km/h).
    pub spread_rate_kmh: f64,
    /// Direction the fire is pushed towards (echoed wind direction, degrees).
    pub primary_direction: f64,
    /// Minutes for the front to cover one kilometre.
    pub time_to_property_minutes: f64,
    /// Minutes needed to evacuate.
    pub evacuation_time_needed: u32,
    /// Compass directions considered safe.
    pub safe_zones: Vec<String>,
}

/// One hourly sample of the radial growth projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadSample {
    /// Zero-based hour index.
    pub hour: u32,
    /// Accumulated fire radius (km).
    pub radius_km: f64,
    /// Burned area (hectares).
    pub area_hectares: f64,
    /// Fire perimeter (km).
    pub perimeter_km: f64,
}

/// Hourly radial growth projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadProjection {
    /// Samples in hour order; radius never decreases.
    pub spread_patterns: Vec<SpreadSample>,
    /// Area of the last sample (hectares).
    pub total_area_hectares: f64,
}

/// Complete risk assessment for a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Model-predicted overall score in `[0, 100]`.
    pub overall_risk_score: f64,
    /// Tier derived from [`Self::overall_risk_score`].
    pub risk_level: RiskLevel,
    /// Heuristic sub-scores.
    pub component_scores: ComponentScores,
    /// Mitigation actions in generation order.
    pub recommendations: Vec<Recommendation>,
    /// Single-shot spread estimate.
    pub fire_spread_simulation: SpreadEstimate,
    /// Static confidence placeholder.
    pub confidence_score: f64,
    /// Version of the model that produced the score.
    pub model_version: String,
    /// When the report was created.
    pub assessment_timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_boundaries_are_inclusive_on_lower_bound() {
        assert_eq!(RiskLevel::from_score(100.0), RiskLevel::Extreme);
        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::Extreme);
        assert_eq!(RiskLevel::from_score(79.9), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(59.99), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(39.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(20.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(19.9), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Minimal);
    }

    #[test]
    fn risk_level_display_matches_wire_format() {
        assert_eq!(RiskLevel::Extreme.to_string(), "EXTREME");
        assert_eq!(RiskLevel::Moderate.as_ref(), "MODERATE");
        assert_eq!(
            serde_json::to_string(&RiskLevel::Minimal).unwrap(),
            "\"MINIMAL\""
        );
    }

    #[test]
    fn model_vector_follows_training_order_and_zero_fills() {
        let features = FeatureMapping::new()
            .with(FeatureName::HistoricalFires, 3.0)
            .with(FeatureName::Ndvi, 0.5)
            .with(FeatureName::VegetationDensity, 0.9);

        let vector = features.model_vector();
        assert_eq!(vector.len(), MODEL_FEATURES.len());
        assert!((vector[0] - 0.5).abs() < f64::EPSILON);
        assert!((vector[14] - 3.0).abs() < f64::EPSILON);
        assert!(vector[1..14].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn model_features_are_distinct_and_exclude_overrides() {
        for (i, a) in MODEL_FEATURES.iter().enumerate() {
            for b in &MODEL_FEATURES[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(!MODEL_FEATURES.contains(&FeatureName::VegetationDensity));
        assert!(!MODEL_FEATURES.contains(&FeatureName::WindDirection));
    }

    #[test]
    fn feature_mapping_serializes_with_snake_case_keys() {
        let features = FeatureMapping::new()
            .with(FeatureName::WindSpeed, 15.2)
            .with(FeatureName::DistanceToFireStation, 5.0);
        let json = serde_json::to_value(&features).unwrap();
        assert_eq!(json["wind_speed"], 15.2);
        assert_eq!(json["distance_to_fire_station"], 5.0);

        let back: FeatureMapping = serde_json::from_value(json).unwrap();
        assert_eq!(back, features);
    }

    #[test]
    fn feature_name_parses_from_str() {
        for name in FeatureName::all() {
            let parsed: FeatureName = name.as_ref().parse().unwrap();
            assert_eq!(parsed, *name);
        }
        assert!("not_a_feature".parse::<FeatureName>().is_err());
    }
}
