use garde::Validate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::detection::ExtractionResult;
use crate::models::job::{JobStatus, SubmitOptions};

/// Text fields of an upload form (metadata portion).
#[derive(Debug, Default, Validate)]
pub struct SubmitForm {
    #[garde(length(max = 32))]
    pub vehicle_type: Option<String>,

    #[garde(length(max = 64))]
    pub range: Option<String>,

    #[garde(length(max = 200))]
    pub provided_brand: Option<String>,

    #[garde(length(max = 16))]
    pub provided_year: Option<String>,
}

impl SubmitForm {
    /// Blank fields are treated as absent.
    pub fn set_field(&mut self, name: &str, value: String) {
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match name {
            "vehicleType" | "vehicle_type" => self.vehicle_type = value,
            "range" => self.range = value,
            "providedBrand" | "provided_brand" => self.provided_brand = value,
            "providedYear" | "provided_year" => self.provided_year = value,
            _ => {}
        }
    }

    pub fn into_options(self) -> SubmitOptions {
        SubmitOptions {
            vehicle_type: self.vehicle_type,
            range: self.range,
            declared_brand: self.provided_brand,
            declared_year: self.provided_year,
        }
    }
}

/// Response after submitting a video for asynchronous extraction.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub success: bool,
    pub id: Uuid,
    pub status: JobStatus,
    pub percent: u8,
    pub stage: String,
}

/// Response carrying a finished extraction (async result or inline run).
#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub success: bool,
    pub result: ExtractionResult,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_accepts_both_field_spellings() {
        let mut form = SubmitForm::default();
        form.set_field("vehicleType", "motorcycle".to_string());
        form.set_field("provided_brand", " BMW ".to_string());
        form.set_field("providedYear", "".to_string());
        form.set_field("unrelated", "x".to_string());

        let options = form.into_options();
        assert_eq!(options.vehicle_type.as_deref(), Some("motorcycle"));
        assert_eq!(options.declared_brand.as_deref(), Some("BMW"));
        assert!(options.declared_year.is_none());
        assert!(options.range.is_none());
    }

    #[test]
    fn test_oversized_brand_is_rejected() {
        let form = SubmitForm {
            provided_brand: Some("x".repeat(201)),
            ..SubmitForm::default()
        };
        assert!(form.validate().is_err());
    }
}
