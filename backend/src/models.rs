use serde::{Deserialize, Serialize};
use usage_inference::{ModelInput, FEATURE_COUNT};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    #[serde(rename = "IN_KL_ALP")]
    Alappuzha,
    #[serde(rename = "IN_KL_ERN")]
    Ernakulam,
    #[serde(rename = "IN_KL_TVM")]
    Thiruvananthapuram,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Alappuzha, Region::Ernakulam, Region::Thiruvananthapuram];

    pub fn code(&self) -> f64 {
        match self {
            Region::Alappuzha => 0.0,
            Region::Ernakulam => 1.0,
            Region::Thiruvananthapuram => 2.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Alappuzha => "IN_KL_ALP",
            Region::Ernakulam => "IN_KL_ERN",
            Region::Thiruvananthapuram => "IN_KL_TVM",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dwelling {
    #[default]
    Apartment,
    #[serde(rename = "Independent House")]
    IndependentHouse,
    Villa,
}

impl Dwelling {
    pub const ALL: [Dwelling; 3] = [Dwelling::Apartment, Dwelling::IndependentHouse, Dwelling::Villa];

    pub fn code(&self) -> f64 {
        match self {
            Dwelling::Apartment => 0.0,
            Dwelling::IndependentHouse => 1.0,
            Dwelling::Villa => 2.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dwelling::Apartment => "Apartment",
            Dwelling::IndependentHouse => "Independent House",
            Dwelling::Villa => "Villa",
        }
    }
}

/// Chart labels for the model features, in feature vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "📍 Region",
    "🏢 Dwelling Type",
    "👨‍👩‍👧 Number of Occupants",
    "🏠 House Area (sqft)",
    "🔌 Appliance Score",
    "⚡ Connected Load (kW)",
    "🌡 Temperature (°C)",
    "💧 Humidity (%)",
    "📉 Usage Deviation (kWh)",
    "📊 Usage Ratio",
    "⚙️ Load Utilization",
];

/// Household parameters submitted through the dashboard form.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HouseholdInput {
    pub region: Region,
    pub dwelling: Dwelling,
    pub occupants: u32,
    pub house_area: u32,
    pub appliance_score: u32,
    pub connected_load: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub deviation_abs: f64,
}

impl Default for HouseholdInput {
    fn default() -> Self {
        HouseholdInput {
            region: Region::default(),
            dwelling: Dwelling::default(),
            occupants: 4,
            house_area: 1200,
            appliance_score: 12,
            connected_load: 5.0,
            temperature: 30.0,
            humidity: 65.0,
            deviation_abs: 5.0,
        }
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("{} must be a number", name));
    }
    if !(min..=max).contains(&value) {
        return Err(format!(
            "{} must be between {} and {} (value: {})",
            name, min, max, value
        ));
    }
    Ok(())
}

impl HouseholdInput {
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("Number of Occupants", self.occupants as f64, 1.0, 10.0),
            ("House Area (sqft)", self.house_area as f64, 300.0, 5000.0),
            ("Appliance Score", self.appliance_score as f64, 1.0, 30.0),
            ("Connected Load (kW)", self.connected_load, 1.0, 20.0),
            ("Temperature (°C)", self.temperature, 10.0, 50.0),
            ("Humidity (%)", self.humidity, 20.0, 100.0),
            ("Usage Deviation (kWh)", self.deviation_abs, 0.0, 50.0),
        ];

        for (name, value, min, max) in fields {
            check_range(name, value, min, max)?;
        }

        Ok(())
    }

    pub fn derived(&self) -> DerivedFeatures {
        DerivedFeatures::new(self.connected_load, self.deviation_abs)
    }

    pub fn to_features(&self) -> [f64; FEATURE_COUNT] {
        let derived = self.derived();
        [
            self.region.code(),
            self.dwelling.code(),
            self.occupants as f64,
            self.house_area as f64,
            self.appliance_score as f64,
            self.connected_load,
            self.temperature,
            self.humidity,
            self.deviation_abs,
            derived.usage_ratio,
            derived.load_utilization,
        ]
    }

    pub fn to_model_input(&self) -> ModelInput {
        ModelInput {
            features: self.to_features().to_vec(),
        }
    }
}

/// Energy figures computed from the connected load and the usage deviation.
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct DerivedFeatures {
    pub expected_energy: f64,
    pub actual_energy: f64,
    pub usage_ratio: f64,
    pub load_utilization: f64,
}

impl DerivedFeatures {
    pub fn new(connected_load: f64, deviation_abs: f64) -> Self {
        let expected_energy = (connected_load * 5.0).max(1.0);
        let actual_energy = expected_energy + deviation_abs;

        DerivedFeatures {
            expected_energy,
            actual_energy,
            usage_ratio: actual_energy / expected_energy,
            load_utilization: actual_energy / connected_load.max(0.1),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FeatureImpact {
    pub name: String,
    pub percent: f64,
}

/// Everything the result section of the dashboard shows.
#[derive(Debug, Serialize, Clone)]
pub struct AnalysisReport {
    pub abnormal: bool,
    pub normal_probability: f64,
    pub abnormal_probability: f64,
    pub reasons: Vec<String>,
    pub impacts: Vec<FeatureImpact>,
    pub actions: Vec<String>,
    pub timestamp: String,
}

impl AnalysisReport {
    pub fn label(&self) -> &'static str {
        if self.abnormal {
            "⚠️ Abnormal Electricity Usage Detected"
        } else {
            "✅ Normal Electricity Usage Detected"
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(HouseholdInput::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_fields_are_named() {
        let input = HouseholdInput {
            humidity: 10.0,
            ..HouseholdInput::default()
        };
        let err = input.validate().unwrap_err();
        assert!(err.starts_with("Humidity (%)"), "{}", err);

        let input = HouseholdInput {
            occupants: 0,
            ..HouseholdInput::default()
        };
        assert!(input.validate().unwrap_err().contains("Occupants"));

        let input = HouseholdInput {
            deviation_abs: f64::NAN,
            ..HouseholdInput::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let input = HouseholdInput {
            occupants: 10,
            house_area: 300,
            connected_load: 20.0,
            deviation_abs: 0.0,
            humidity: 100.0,
            ..HouseholdInput::default()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn derived_features_follow_connected_load() {
        let derived = DerivedFeatures::new(5.0, 5.0);
        assert_eq!(derived.expected_energy, 25.0);
        assert_eq!(derived.actual_energy, 30.0);
        assert!((derived.usage_ratio - 1.2).abs() < 1e-12);
        assert!((derived.load_utilization - 6.0).abs() < 1e-12);
    }

    #[test]
    fn expected_energy_never_drops_below_one() {
        let derived = DerivedFeatures::new(0.05, 2.0);
        assert_eq!(derived.expected_energy, 1.0);
        assert_eq!(derived.actual_energy, 3.0);
        // connected load is floored at 0.1 for the utilization
        assert!((derived.load_utilization - 30.0).abs() < 1e-9);
    }

    #[test]
    fn usage_ratio_is_actual_over_expected() {
        for load in [1.0, 2.5, 7.0, 20.0] {
            for deviation in [0.0, 3.3, 12.0, 50.0] {
                let d = DerivedFeatures::new(load, deviation);
                assert!(d.expected_energy >= 1.0);
                assert_eq!(d.usage_ratio, d.actual_energy / d.expected_energy);
            }
        }
    }

    #[test]
    fn feature_vector_uses_category_codes() {
        let input = HouseholdInput {
            region: Region::Thiruvananthapuram,
            dwelling: Dwelling::IndependentHouse,
            ..HouseholdInput::default()
        };
        let features = input.to_features();
        assert_eq!(features.len(), FEATURE_COUNT);
        assert_eq!(features[0], 2.0);
        assert_eq!(features[1], 1.0);
        assert_eq!(features[2], 4.0);
        assert_eq!(features[8], 5.0);
        assert!((features[9] - 1.2).abs() < 1e-12);
        assert!((features[10] - 6.0).abs() < 1e-12);
    }
}
