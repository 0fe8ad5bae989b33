//! Mitigation recommendations derived from risk scores.

use terra_insight_risk_models::{Priority, Recommendation};

fn recommendation(
    priority: Priority,
    action: &str,
    description: &str,
    estimated_cost: u32,
    risk_reduction: u32,
) -> Recommendation {
    Recommendation {
        priority,
        action: action.to_string(),
        description: description.to_string(),
        estimated_cost,
        risk_reduction,
    }
}

/// Builds the ordered recommendation list for a property.
///
/// Rules are evaluated in a fixed order and emergency planning is always
/// appended last, so the list is never empty.
#[must_use]
pub fn generate(
    overall_risk_score: f64,
    vegetation_risk: f64,
    _weather_risk: f64,
    terrain_risk: f64,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::with_capacity(4);

    if vegetation_risk > 60.0 {
        recommendations.push(recommendation(
            Priority::High,
            "Vegetation Management",
            "Create defensible space by clearing vegetation within 30 feet of structures",
            2500,
            15,
        ));
    }

    if overall_risk_score > 70.0 {
        recommendations.push(recommendation(
            Priority::High,
            "Install Sprinkler System",
            "Install rooftop sprinkler system for ember protection",
            5000,
            20,
        ));
    }

    if terrain_risk > 50.0 {
        recommendations.push(recommendation(
            Priority::Medium,
            "Create Fuel Breaks",
            "Establish fuel breaks on steep slopes to slow fire spread",
            3500,
            10,
        ));
    }

    recommendations.push(recommendation(
        Priority::Medium,
        "Emergency Planning",
        "Develop and practice evacuation plan with multiple routes",
        0,
        5,
    ));

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(recommendations: &[Recommendation]) -> Vec<&str> {
        recommendations.iter().map(|r| r.action.as_str()).collect()
    }

    #[test]
    fn high_vegetation_and_overall_scores() {
        let list = generate(75.0, 70.0, 99.0, 40.0);
        assert_eq!(
            actions(&list),
            [
                "Vegetation Management",
                "Install Sprinkler System",
                "Emergency Planning"
            ]
        );
        assert_eq!(list[1].estimated_cost, 5000);
        assert_eq!(list[1].risk_reduction, 20);
    }

    #[test]
    fn low_scores_only_get_emergency_planning() {
        let list = generate(10.0, 20.0, 0.0, 0.0);
        assert_eq!(actions(&list), ["Emergency Planning"]);
        assert_eq!(list[0].priority, Priority::Medium);
        assert_eq!(list[0].estimated_cost, 0);
    }

    #[test]
    fn every_rule_fires_in_order() {
        let list = generate(90.0, 80.0, 100.0, 60.0);
        assert_eq!(
            actions(&list),
            [
                "Vegetation Management",
                "Install Sprinkler System",
                "Create Fuel Breaks",
                "Emergency Planning"
            ]
        );
    }

    #[test]
    fn thresholds_are_exclusive() {
        let list = generate(70.0, 60.0, 0.0, 50.0);
        assert_eq!(actions(&list), ["Emergency Planning"]);
    }
}
