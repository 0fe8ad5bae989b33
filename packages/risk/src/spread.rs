//! Closed-form fire-spread estimators.
//!
//! Two separate models are kept on purpose: [`project_spread`] backs the
//! hourly simulation and [`estimate_spread`] backs the spread block of a
//! risk report. Their coefficients differ and must not be merged.

use std::f64::consts::PI;

use terra_insight_risk_models::{
    FeatureMapping, FeatureName, SpreadEstimate, SpreadProjection, SpreadSample,
};

use crate::RiskError;

/// Spread rate with no wind and no slope, in km/h.
pub const BASE_SPREAD_RATE_KMH: f64 = 0.5;

/// Default duration of an hourly projection.
pub const DEFAULT_SIMULATION_HOURS: u32 = 24;

/// Minutes reported as needed for evacuation.
pub const EVACUATION_TIME_MINUTES: u32 = 30;

/// Safe zones reported with every estimate.
pub const SAFE_ZONES: [&str; 2] = ["North", "Northeast"];

/// Hourly spread rate used by [`project_spread`].
#[must_use]
pub fn projection_rate_kmh(wind_speed: f64, slope: f64) -> f64 {
    BASE_SPREAD_RATE_KMH * (1.0 + wind_speed / 10.0 + slope / 20.0)
}

/// Projects fire growth hour by hour from a point ignition.
///
/// The radius grows by a constant rate each hour; area is reported in
/// hectares and perimeter in kilometres.
///
/// # Errors
///
/// Returns [`RiskError::InvalidInput`] if `hours` is zero.
pub fn project_spread(
    wind_speed: f64,
    slope: f64,
    hours: u32,
) -> Result<SpreadProjection, RiskError> {
    if hours == 0 {
        return Err(RiskError::InvalidInput {
            message: "simulation duration must be at least one hour".to_string(),
        });
    }

    let rate = projection_rate_kmh(wind_speed, slope);
    let mut radius_km = 0.0;
    let spread_patterns: Vec<SpreadSample> = (0..hours)
        .map(|hour| {
            radius_km += rate;
            SpreadSample {
                hour,
                radius_km,
                area_hectares: PI * radius_km * radius_km * 100.0,
                perimeter_km: 2.0 * PI * radius_km,
            }
        })
        .collect();

    let total_area_hectares = spread_patterns
        .last()
        .map_or(0.0, |sample| sample.area_hectares);

    log::debug!(
        "Projected {hours}h spread at {rate:.3} km/h: {total_area_hectares:.1} ha"
    );

    Ok(SpreadProjection {
        spread_patterns,
        total_area_hectares,
    })
}

/// Single-shot spread estimate for a property.
///
/// Missing wind speed defaults to 10 km/h; missing wind direction and
/// slope default to 0.
#[must_use]
pub fn estimate_spread(features: &FeatureMapping) -> SpreadEstimate {
    let wind_speed = features.get_or(FeatureName::WindSpeed, 10.0);
    let wind_direction = features.get_or(FeatureName::WindDirection, 0.0);
    let slope = features.get_or(FeatureName::Slope, 0.0);

    let spread_rate_kmh =
        BASE_SPREAD_RATE_KMH * (1.0 + wind_speed / 20.0) * (1.0 + slope / 30.0);

    SpreadEstimate {
        spread_rate_kmh,
        primary_direction: wind_direction,
        time_to_property_minutes: 60.0 / spread_rate_kmh,
        evacuation_time_needed: EVACUATION_TIME_MINUTES,
        safe_zones: SAFE_ZONES.iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_grows_linearly() {
        let projection = project_spread(0.0, 20.0, 3).unwrap();
        let radii: Vec<f64> = projection
            .spread_patterns
            .iter()
            .map(|s| s.radius_km)
            .collect();

        assert!((projection_rate_kmh(0.0, 20.0) - 1.0).abs() < 1e-12);
        assert_eq!(radii, [1.0, 2.0, 3.0]);
        assert_eq!(projection.spread_patterns[0].hour, 0);
        assert!((projection.spread_patterns[1].area_hectares - PI * 400.0).abs() < 1e-9);
        assert!((projection.spread_patterns[1].perimeter_km - 4.0 * PI).abs() < 1e-12);
        assert!((projection.total_area_hectares - PI * 900.0).abs() < 1e-9);
    }

    #[test]
    fn projection_rate_adds_wind_and_slope_terms() {
        assert!((projection_rate_kmh(0.0, 0.0) - BASE_SPREAD_RATE_KMH).abs() < 1e-12);
        assert!((projection_rate_kmh(10.0, 20.0) - 1.5).abs() < 1e-12);

        let projection = project_spread(10.0, 20.0, 3).unwrap();
        let radii: Vec<f64> = projection
            .spread_patterns
            .iter()
            .map(|s| s.radius_km)
            .collect();
        assert_eq!(radii, [1.5, 3.0, 4.5]);
        assert!((projection.total_area_hectares - PI * 2025.0).abs() < 1e-9);
    }

    #[test]
    fn projection_has_one_sample_per_hour() {
        let projection = project_spread(5.0, 0.0, DEFAULT_SIMULATION_HOURS).unwrap();
        assert_eq!(projection.spread_patterns.len(), 24);
        assert!(
            projection
                .spread_patterns
                .windows(2)
                .all(|w| w[1].radius_km > w[0].radius_km)
        );
    }

    #[test]
    fn zero_hour_projection_is_rejected() {
        assert!(matches!(
            project_spread(10.0, 10.0, 0),
            Err(RiskError::InvalidInput { .. })
        ));
    }

    #[test]
    fn single_shot_estimate() {
        let features = FeatureMapping::new()
            .with(FeatureName::WindSpeed, 20.0)
            .with(FeatureName::WindDirection, 225.0)
            .with(FeatureName::Slope, 30.0);
        let estimate = estimate_spread(&features);

        assert!((estimate.spread_rate_kmh - 2.0).abs() < 1e-12);
        assert!((estimate.primary_direction - 225.0).abs() < f64::EPSILON);
        assert!((estimate.time_to_property_minutes - 30.0).abs() < 1e-12);
        assert_eq!(estimate.evacuation_time_needed, 30);
        assert_eq!(estimate.safe_zones, ["North", "Northeast"]);
    }

    #[test]
    fn single_shot_estimate_defaults() {
        let estimate = estimate_spread(&FeatureMapping::new());
        assert!((estimate.spread_rate_kmh - 0.75).abs() < 1e-12);
        assert!((estimate.time_to_property_minutes - 80.0).abs() < 1e-9);
    }
}
