//! Turns a model output into the explanation shown on the dashboard.

use log::info;
use usage_inference::{InferenceModel, ModelOutput, Result};

use crate::models::{AnalysisReport, DerivedFeatures, FeatureImpact, HouseholdInput, FEATURE_NAMES};

/// Number of features drawn in the impact chart.
pub const TOP_IMPACTS: usize = 6;

const ABNORMAL_ACTIONS: [&str; 5] = [
    "Reduce simultaneous use of high-power appliances",
    "Inspect appliances contributing to abnormal usage",
    "Optimize cooling and heating during peak hours",
    "Review connected electrical load capacity",
    "Upgrade to energy-efficient appliances",
];

const NORMAL_ACTIONS: [&str; 3] = [
    "Maintain current electricity usage pattern",
    "Monitor peak-hour consumption regularly",
    "Adopt energy-efficient usage practices",
];

/// Rule-based reasons behind a prediction.
pub fn explain(abnormal: bool, input: &HouseholdInput, derived: &DerivedFeatures) -> Vec<String> {
    if !abnormal {
        return vec!["Usage pattern falls within normal operating limits".to_string()];
    }

    let rules = [
        (
            input.deviation_abs > 10.0,
            "Significant deviation from expected electricity usage",
        ),
        (
            derived.usage_ratio > 1.5,
            "Actual electricity consumption is much higher than expected",
        ),
        (
            derived.load_utilization > 8.0,
            "Electrical load utilization is unusually high",
        ),
        (
            input.appliance_score > 18,
            "High appliance score contributes to elevated demand",
        ),
    ];

    let mut reasons: Vec<String> = rules
        .iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, reason)| reason.to_string())
        .collect();

    if reasons.is_empty() {
        reasons.push("Multiple moderate factors collectively contributed to abnormal usage".to_string());
    }
    reasons
}

/// Absolute attributions as percentages of their total.
///
/// All-zero attributions stay zero instead of dividing by zero.
pub fn impact_percentages(attributions: &[f64]) -> Vec<f64> {
    let magnitudes: Vec<f64> = attributions.iter().map(|a| a.abs()).collect();
    let total: f64 = magnitudes.iter().sum();
    if total == 0.0 {
        return magnitudes;
    }
    magnitudes.iter().map(|m| m / total * 100.0).collect()
}

/// The `n` largest impacts, highest first. Among equal impacts the later
/// feature ranks higher.
pub fn top_impacts(percentages: &[f64], n: usize) -> Vec<FeatureImpact> {
    let mut order: Vec<usize> = (0..percentages.len()).collect();
    order.sort_by(|&a, &b| percentages[b].total_cmp(&percentages[a]).then(b.cmp(&a)));

    order
        .into_iter()
        .take(n)
        .map(|i| FeatureImpact {
            name: FEATURE_NAMES.get(i).map_or_else(|| format!("Feature {}", i), |label| label.to_string()),
            percent: percentages[i],
        })
        .collect()
}

pub fn recommended_actions(abnormal: bool) -> Vec<String> {
    let actions: &[&str] = if abnormal { &ABNORMAL_ACTIONS } else { &NORMAL_ACTIONS };
    actions.iter().map(|a| a.to_string()).collect()
}

/// Assemble the dashboard report from a household and the model's verdict.
pub fn build_report(input: &HouseholdInput, output: &ModelOutput) -> AnalysisReport {
    let derived = input.derived();
    let abnormal = output.is_abnormal();
    let percentages = impact_percentages(&output.attributions);

    AnalysisReport {
        abnormal,
        normal_probability: output.probability(0) * 100.0,
        abnormal_probability: output.probability(1) * 100.0,
        reasons: explain(abnormal, input, &derived),
        impacts: top_impacts(&percentages, TOP_IMPACTS),
        actions: recommended_actions(abnormal),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Run the full pipeline for one form submission.
pub fn analyze(model: &InferenceModel, input: &HouseholdInput) -> Result<AnalysisReport> {
    let output = model.predict(&input.to_model_input())?;
    let report = build_report(input, &output);
    info!(
        "Analysis: abnormal={} abnormal_probability={:.1}%",
        report.abnormal, report.abnormal_probability
    );
    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    use ndarray::{array, Array1, ArrayView1};
    use usage_inference::{AttributionEngine, Classifier, FeatureScaler, FEATURE_COUNT};

    /// Passes features through unchanged.
    pub(crate) struct IdentityScaler;

    impl FeatureScaler for IdentityScaler {
        fn transform(&self, x: &[f64]) -> Result<Array1<f64>> {
            Ok(Array1::from(x.to_vec()))
        }

        fn n_features(&self) -> usize {
            FEATURE_COUNT
        }
    }

    /// Abnormal whenever the usage deviation exceeds 10 kWh.
    pub(crate) struct DeviationRule;

    impl Classifier for DeviationRule {
        fn predict(&self, x: ArrayView1<f64>) -> Result<usize> {
            Ok(usize::from(x[8] > 10.0))
        }

        fn predict_proba(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
            Ok(if x[8] > 10.0 { array![0.2, 0.8] } else { array![0.9, 0.1] })
        }

        fn n_features(&self) -> usize {
            FEATURE_COUNT
        }
    }

    /// Puts all of the attribution on the deviation and usage ratio.
    pub(crate) struct FixedAttributions;

    impl AttributionEngine for FixedAttributions {
        fn compute_attributions(&self, _x: ArrayView1<f64>, _class: usize) -> Result<Array1<f64>> {
            let mut phi = Array1::zeros(FEATURE_COUNT);
            phi[8] = 0.3;
            phi[9] = -0.1;
            Ok(phi)
        }
    }

    pub(crate) fn stub_model() -> InferenceModel {
        InferenceModel::from_parts(
            Arc::new(IdentityScaler),
            Arc::new(DeviationRule),
            Arc::new(FixedAttributions),
        )
    }

    fn abnormal_input() -> HouseholdInput {
        HouseholdInput {
            deviation_abs: 30.0,
            ..HouseholdInput::default()
        }
    }

    #[test]
    fn normal_prediction_has_a_single_reason() {
        let input = HouseholdInput::default();
        let reasons = explain(false, &input, &input.derived());
        assert_eq!(reasons, vec!["Usage pattern falls within normal operating limits"]);
    }

    #[test]
    fn abnormal_rules_fire_in_order() {
        let input = HouseholdInput {
            deviation_abs: 30.0,
            appliance_score: 25,
            ..HouseholdInput::default()
        };
        // expected 25, actual 55: ratio 2.2, utilization 11
        let reasons = explain(true, &input, &input.derived());
        assert_eq!(
            reasons,
            vec![
                "Significant deviation from expected electricity usage",
                "Actual electricity consumption is much higher than expected",
                "Electrical load utilization is unusually high",
                "High appliance score contributes to elevated demand",
            ]
        );
    }

    #[test]
    fn abnormal_without_triggered_rules_falls_back() {
        let input = HouseholdInput::default();
        let reasons = explain(true, &input, &input.derived());
        assert_eq!(
            reasons,
            vec!["Multiple moderate factors collectively contributed to abnormal usage"]
        );
    }

    #[test]
    fn thresholds_are_strict() {
        // deviation exactly 10 with load 20: ratio 1.1, utilization 5.5
        let input = HouseholdInput {
            deviation_abs: 10.0,
            connected_load: 20.0,
            appliance_score: 18,
            ..HouseholdInput::default()
        };
        let reasons = explain(true, &input, &input.derived());
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].starts_with("Multiple moderate factors"));
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let percent = impact_percentages(&[0.2, -0.6, 0.0, 0.2]);
        assert!((percent.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        assert!((percent[1] - 60.0).abs() < 1e-9);
        assert!(percent.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn zero_attributions_stay_zero() {
        let percent = impact_percentages(&[0.0; FEATURE_COUNT]);
        assert_eq!(percent, vec![0.0; FEATURE_COUNT]);
    }

    #[test]
    fn top_impacts_are_sorted_and_truncated() {
        let percent = vec![5.0, 30.0, 0.0, 10.0, 10.0, 1.0, 2.0, 3.0, 20.0, 15.0, 4.0];
        let top = top_impacts(&percent, TOP_IMPACTS);
        assert_eq!(top.len(), 6);
        let names: Vec<&str> = top.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "🏢 Dwelling Type",
                "📉 Usage Deviation (kWh)",
                "📊 Usage Ratio",
                "🔌 Appliance Score",
                "🏠 House Area (sqft)",
                "📍 Region",
            ]
        );
    }

    #[test]
    fn all_zero_impacts_chart_the_last_features() {
        let top = top_impacts(&impact_percentages(&[0.0; FEATURE_COUNT]), TOP_IMPACTS);
        let names: Vec<&str> = top.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "⚙️ Load Utilization",
                "📊 Usage Ratio",
                "📉 Usage Deviation (kWh)",
                "💧 Humidity (%)",
                "🌡 Temperature (°C)",
                "⚡ Connected Load (kW)",
            ]
        );
    }

    #[test]
    fn ties_at_the_cutoff_keep_the_later_feature() {
        let percent = vec![5.0, 20.0, 20.0, 20.0, 10.0, 10.0, 0.0, 0.0, 0.0, 0.0, 5.0];
        let top = top_impacts(&percent, TOP_IMPACTS);
        let names: Vec<&str> = top.iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"⚙️ Load Utilization"));
        assert!(!names.contains(&"📍 Region"));
        assert_eq!(names[0], "🏠 House Area (sqft)");
    }

    #[test]
    fn actions_depend_on_the_prediction() {
        assert_eq!(recommended_actions(true).len(), 5);
        assert_eq!(
            recommended_actions(false),
            vec![
                "Maintain current electricity usage pattern",
                "Monitor peak-hour consumption regularly",
                "Adopt energy-efficient usage practices",
            ]
        );
    }

    #[test]
    fn analyze_builds_a_complete_report() {
        let report = analyze(&stub_model(), &abnormal_input()).unwrap();
        assert!(report.abnormal);
        assert!((report.abnormal_probability - 80.0).abs() < 1e-9);
        assert!((report.normal_probability - 20.0).abs() < 1e-9);
        assert_eq!(report.impacts[0].name, "📉 Usage Deviation (kWh)");
        assert!((report.impacts[0].percent - 75.0).abs() < 1e-9);
        assert_eq!(report.impacts.len(), TOP_IMPACTS);
        assert_eq!(report.actions.len(), 5);
        assert_eq!(report.reasons[0], "Significant deviation from expected electricity usage");
    }
}
