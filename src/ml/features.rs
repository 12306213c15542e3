use ndarray::Array2;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of model inputs
pub const N_FEATURES: usize = 10;

/// Column names in the order the scaler and both forests expect them.
///
/// Training-time extraction and inference-time input both go through
/// [`FeatureVector::to_row`], so this is the only place the order is defined.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "age",
    "temperature",
    "heart_rate",
    "bp_sys",
    "bp_dia",
    "oxygen_sat",
    "symptoms_count",
    "chronic_conditions",
    "region_risk_index",
    "days_since_onset",
];

pub(crate) const AGE: usize = 0;
pub(crate) const TEMPERATURE: usize = 1;
pub(crate) const OXYGEN_SAT: usize = 5;
pub(crate) const CHRONIC_CONDITIONS: usize = 7;

/// Patient vitals for a single scoring request or dataset row.
///
/// Values are not range-checked; whatever the caller sends is handed to the
/// models unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Age in years
    #[serde(deserialize_with = "integral")]
    pub age: i32,

    /// Body temperature in °C
    pub temperature: f64,

    /// Beats per minute
    #[serde(deserialize_with = "integral")]
    pub heart_rate: i32,

    /// Systolic blood pressure (mmHg)
    #[serde(deserialize_with = "integral")]
    pub bp_sys: i32,

    /// Diastolic blood pressure (mmHg)
    #[serde(deserialize_with = "integral")]
    pub bp_dia: i32,

    /// Oxygen saturation (%)
    #[serde(deserialize_with = "integral")]
    pub oxygen_sat: i32,

    /// Number of reported symptoms
    #[serde(deserialize_with = "integral")]
    pub symptoms_count: i32,

    /// Number of chronic conditions
    #[serde(deserialize_with = "integral")]
    pub chronic_conditions: i32,

    /// Regional risk index (0.0 - 1.0)
    pub region_risk_index: f64,

    /// Days since symptom onset
    #[serde(deserialize_with = "integral")]
    pub days_since_onset: i32,
}

impl FeatureVector {
    /// The built-in example used by the self-test endpoint and the CLI.
    pub fn sample() -> Self {
        Self {
            age: 45,
            temperature: 38.5,
            heart_rate: 95,
            bp_sys: 130,
            bp_dia: 85,
            oxygen_sat: 96,
            symptoms_count: 3,
            chronic_conditions: 1,
            region_risk_index: 0.4,
            days_since_onset: 4,
        }
    }

    /// Flatten into model input order (see [`FEATURE_NAMES`])
    pub fn to_row(&self) -> [f64; N_FEATURES] {
        [
            self.age as f64,
            self.temperature,
            self.heart_rate as f64,
            self.bp_sys as f64,
            self.bp_dia as f64,
            self.oxygen_sat as f64,
            self.symptoms_count as f64,
            self.chronic_conditions as f64,
            self.region_risk_index,
            self.days_since_onset as f64,
        ]
    }
}

/// Accept `45`, `45.0` or `"45"` for integer fields; fractional and
/// out-of-range values are rejected.
fn integral<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    struct IntegralVisitor;

    impl<'de> Visitor<'de> for IntegralVisitor {
        type Value = i32;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer or an integral number")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i32, E> {
            i32::try_from(v).map_err(|_| E::custom(format!("{} is out of range for i32", v)))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i32, E> {
            i32::try_from(v).map_err(|_| E::custom(format!("{} is out of range for i32", v)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i32, E> {
            if v.fract() != 0.0 || v < i32::MIN as f64 || v > i32::MAX as f64 {
                return Err(E::custom(format!("expected an integral number, got {}", v)));
            }
            Ok(v as i32)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i32, E> {
            match v.trim().parse::<i64>() {
                Ok(n) => self.visit_i64(n),
                Err(_) => match v.trim().parse::<f64>() {
                    Ok(x) if x.is_finite() => self.visit_f64(x),
                    _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
                },
            }
        }
    }

    deserializer.deserialize_any(IntegralVisitor)
}

/// Stack feature vectors into an `n × N_FEATURES` matrix
pub fn to_matrix(vectors: &[FeatureVector]) -> Array2<f64> {
    let data: Vec<f64> = vectors.iter().flat_map(|v| v.to_row()).collect();
    // Shape always matches: every row contributes exactly N_FEATURES values
    Array2::from_shape_vec((vectors.len(), N_FEATURES), data)
        .unwrap_or_else(|_| Array2::zeros((0, N_FEATURES)))
}

/// High risk when elderly, hypoxic, or multimorbid
pub fn derive_risk(row: &[f64]) -> usize {
    let high = row[AGE] > 65.0 || row[OXYGEN_SAT] < 92.0 || row[CHRONIC_CONDITIONS] >= 2.0;
    usize::from(high)
}

/// Composite score whose tertiles define the severity label
pub fn severity_score(row: &[f64]) -> f64 {
    (row[TEMPERATURE] - 37.0).max(0.0)
        + (100.0 - row[OXYGEN_SAT]) * 0.2
        + row[CHRONIC_CONDITIONS] * 0.5
}
