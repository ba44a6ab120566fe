use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::validation::ValidationVerdict;

/// Identifier of the engine family that produced a result.
pub const PROCESSOR_NAME: &str = "python-easyocr";

/// Range label reported when extraction fails before a range is resolved.
pub const DEFAULT_RANGE_LABEL: &str = "0-60mph";

/// Vehicle category declared by the uploader.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VehicleType {
    #[default]
    Car,
    Motorcycle,
}

impl VehicleType {
    /// Anything that is not recognisably a motorcycle is measured as a car.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse().ok()).unwrap_or_default()
    }
}

/// The three fixed speed windows the engine measures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
pub enum SpeedRange {
    #[serde(rename = "0-60mph")]
    #[strum(serialize = "0-60mph")]
    ZeroToSixtyMph,
    #[serde(rename = "0-100km/h")]
    #[strum(serialize = "0-100km/h")]
    ZeroToHundredKmh,
    #[serde(rename = "100-200km/h")]
    #[strum(serialize = "100-200km/h")]
    HundredToTwoHundredKmh,
}

impl SpeedRange {
    pub fn label(self) -> &'static str {
        match self {
            SpeedRange::ZeroToSixtyMph => "0-60mph",
            SpeedRange::ZeroToHundredKmh => "0-100km/h",
            SpeedRange::HundredToTwoHundredKmh => "100-200km/h",
        }
    }

    pub fn target_speed(self) -> u32 {
        match self {
            SpeedRange::ZeroToSixtyMph => 60,
            SpeedRange::ZeroToHundredKmh => 100,
            SpeedRange::HundredToTwoHundredKmh => 200,
        }
    }
}

/// One normalized measurement derived from engine output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub vehicle_type: VehicleType,
    pub range: SpeedRange,
    pub elapsed_ms: Option<u64>,
    pub checkpoints: Vec<u64>,
    pub raw_overlay: String,
    pub quarter_mile_ms: Option<u64>,
    pub target_speed: u32,
}

/// Headline numbers of an extraction, consumed by clients and the validator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub range: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub best_elapsed_ms: Option<u64>,
    pub quarter_mile_ms: Option<u64>,
    pub all_results: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl Summary {
    /// Summary for an extraction that produced no usable engine data.
    pub fn failed(requested_range: Option<&str>, error: impl Into<String>) -> Self {
        let range = requested_range
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_RANGE_LABEL);
        Self {
            range: range.to_string(),
            brand: None,
            model: None,
            year: None,
            best_elapsed_ms: None,
            quarter_mile_ms: None,
            all_results: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoInfo {
    pub path: String,
    pub filename: String,
    pub size_bytes: u64,
}

/// Result document stored on a finished job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub processor: String,
    pub video: VideoInfo,
    pub detections: Vec<Detection>,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub validation: Option<ValidationVerdict>,
}
