//! Risk report assembly.

use std::sync::Arc;

use chrono::Utc;
use terra_insight_model::RiskModel;
use terra_insight_risk_models::{ComponentScores, FeatureMapping, RiskLevel, RiskReport};

use crate::{RiskError, heuristics, recommendations, spread};

/// Confidence reported with every assessment.
pub const CONFIDENCE_SCORE: f64 = 0.85;

/// Combines model inference with the heuristic scorers into a
/// [`RiskReport`].
#[derive(Clone)]
pub struct RiskAssessor {
    model: Arc<dyn RiskModel>,
}

impl RiskAssessor {
    /// Creates an assessor backed by `model`.
    #[must_use]
    pub fn new(model: Arc<dyn RiskModel>) -> Self {
        Self { model }
    }

    /// The model backing this assessor.
    #[must_use]
    pub const fn model(&self) -> &Arc<dyn RiskModel> {
        &self.model
    }

    /// Scores one property.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Model`] if inference fails; no partial report
    /// is produced.
    pub fn assess(&self, features: &FeatureMapping) -> Result<RiskReport, RiskError> {
        let overall_risk_score = self.model.predict(features)?;

        let component_scores = ComponentScores {
            vegetation_risk: heuristics::vegetation_risk(features),
            weather_risk: heuristics::weather_risk(features),
            terrain_risk: heuristics::terrain_risk(features),
            proximity_risk: heuristics::proximity_risk(features),
        };

        let recommendations = recommendations::generate(
            overall_risk_score,
            component_scores.vegetation_risk,
            component_scores.weather_risk,
            component_scores.terrain_risk,
        );

        let report = RiskReport {
            overall_risk_score,
            risk_level: RiskLevel::from_score(overall_risk_score),
            component_scores,
            recommendations,
            fire_spread_simulation: spread::estimate_spread(features),
            confidence_score: CONFIDENCE_SCORE,
            model_version: self.model.info().version,
            assessment_timestamp: Utc::now(),
        };

        log::info!(
            "Risk calculation complete. Score: {:.2} ({})",
            report.overall_risk_score,
            report.risk_level
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use terra_insight_model::{ModelError, ModelInfo, NormalizationMode};
    use terra_insight_risk_models::FeatureName;

    use super::*;

    struct FixedModel(f64);

    impl RiskModel for FixedModel {
        fn predict(&self, _features: &FeatureMapping) -> Result<f64, ModelError> {
            Ok(self.0)
        }

        fn info(&self) -> ModelInfo {
            ModelInfo {
                model_type: "Fixed".to_string(),
                version: "test-1".to_string(),
                features: Vec::new(),
                trained: true,
                last_trained: None,
                accuracy_metrics: None,
                normalization: NormalizationMode::Trained,
            }
        }
    }

    struct UnavailableModel;

    impl RiskModel for UnavailableModel {
        fn predict(&self, _features: &FeatureMapping) -> Result<f64, ModelError> {
            Err(ModelError::NotTrained)
        }

        fn info(&self) -> ModelInfo {
            FixedModel(0.0).info()
        }
    }

    fn dry_steep_property() -> FeatureMapping {
        FeatureMapping::new()
            .with(FeatureName::Ndvi, 0.7)
            .with(FeatureName::FuelMoisture, 20.0)
            .with(FeatureName::Slope, 35.0)
            .with(FeatureName::Aspect, 180.0)
            .with(FeatureName::WindSpeed, 20.0)
    }

    #[test]
    fn report_combines_every_stage() {
        let assessor = RiskAssessor::new(Arc::new(FixedModel(82.5)));
        let report = assessor.assess(&dry_steep_property()).unwrap();

        assert!((report.overall_risk_score - 82.5).abs() < f64::EPSILON);
        assert_eq!(report.risk_level, RiskLevel::Extreme);
        assert!((report.component_scores.vegetation_risk - 80.0).abs() < f64::EPSILON);
        assert!((report.component_scores.terrain_risk - 60.0).abs() < f64::EPSILON);
        assert_eq!(report.recommendations.len(), 4);
        assert!((report.fire_spread_simulation.spread_rate_kmh - (1.0 + 35.0 / 30.0)).abs() < 1e-12);
        assert!((report.confidence_score - CONFIDENCE_SCORE).abs() < f64::EPSILON);
        assert_eq!(report.model_version, "test-1");
    }

    #[test]
    fn risk_level_follows_model_score() {
        let at_boundary = RiskAssessor::new(Arc::new(FixedModel(60.0)))
            .assess(&FeatureMapping::new())
            .unwrap();
        assert_eq!(at_boundary.risk_level, RiskLevel::High);
        assert_eq!(at_boundary.recommendations.len(), 1);
    }

    #[test]
    fn model_failure_aborts_the_report() {
        let assessor = RiskAssessor::new(Arc::new(UnavailableModel));
        assert!(matches!(
            assessor.assess(&dry_steep_property()),
            Err(RiskError::Model(ModelError::NotTrained))
        ));
    }
}
