use serde::{Deserialize, Serialize};
use strum::Display;

/// Outcome of comparing detected vehicle identity with the declared one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Verdict {
    Ok,
    Mismatch,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ValidationReason {
    BrandMismatch,
    YearMismatch,
    NoSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub verdict: Verdict,
    pub reasons: Vec<ValidationReason>,
}

/// Vehicle identity declared by the uploader.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclaredVehicle {
    pub brand: Option<String>,
    pub year: Option<String>,
}
