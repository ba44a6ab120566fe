use crate::models::detection::Summary;
use crate::models::validation::{DeclaredVehicle, ValidationReason, ValidationVerdict, Verdict};

/// Compare the detected vehicle identity against what the uploader declared.
///
/// Performs:
/// - Brand check: the detected brand must contain the declared brand
///   (case-insensitive), so "Toyota Supra" satisfies "toyota"
/// - Year check: declared and detected years must be equal as text
///
/// A check is skipped when either side is missing. Reasons are reported
/// brand first, then year.
pub fn validate(summary: Option<&Summary>, declared: &DeclaredVehicle) -> ValidationVerdict {
    let Some(summary) = summary else {
        return ValidationVerdict {
            verdict: Verdict::Unknown,
            reasons: vec![ValidationReason::NoSummary],
        };
    };

    let mut reasons = Vec::new();

    // ── Brand ────────────────────────────────────────────────────────
    let declared_brand = declared.brand.as_deref().filter(|b| !b.is_empty());
    if let (Some(expected), Some(detected)) = (declared_brand, summary.brand.as_deref()) {
        if !detected.to_lowercase().contains(&expected.to_lowercase()) {
            reasons.push(ValidationReason::BrandMismatch);
        }
    }

    // ── Year ─────────────────────────────────────────────────────────
    let declared_year = declared.year.as_deref().filter(|y| !y.is_empty());
    if let (Some(expected), Some(detected)) = (declared_year, summary.year) {
        if expected != detected.to_string() {
            reasons.push(ValidationReason::YearMismatch);
        }
    }

    ValidationVerdict {
        verdict: if reasons.is_empty() { Verdict::Ok } else { Verdict::Mismatch },
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(brand: Option<&str>, year: Option<i32>) -> Summary {
        Summary {
            range: "0-100km/h".to_string(),
            brand: brand.map(str::to_string),
            model: None,
            year,
            best_elapsed_ms: Some(9800),
            quarter_mile_ms: None,
            all_results: None,
            error: None,
        }
    }

    fn declared(brand: Option<&str>, year: Option<&str>) -> DeclaredVehicle {
        DeclaredVehicle {
            brand: brand.map(str::to_string),
            year: year.map(str::to_string),
        }
    }

    #[test]
    fn test_substring_brand_match() {
        let v = validate(
            Some(&summary(Some("Toyota Supra"), Some(2020))),
            &declared(Some("toyota"), Some("2020")),
        );
        assert_eq!(v.verdict, Verdict::Ok);
        assert!(v.reasons.is_empty());
    }

    #[test]
    fn test_brand_mismatch() {
        let v = validate(
            Some(&summary(Some("BMW"), Some(2019))),
            &declared(Some("Audi"), Some("2019")),
        );
        assert_eq!(v.verdict, Verdict::Mismatch);
        assert_eq!(v.reasons, vec![ValidationReason::BrandMismatch]);
    }

    #[test]
    fn test_both_mismatches_in_order() {
        let v = validate(
            Some(&summary(Some("BMW"), Some(2019))),
            &declared(Some("Audi"), Some("2021")),
        );
        assert_eq!(
            v.reasons,
            vec![ValidationReason::BrandMismatch, ValidationReason::YearMismatch]
        );
    }

    #[test]
    fn test_declared_brand_longer_than_detected_mismatches() {
        let v = validate(
            Some(&summary(Some("Toyota"), None)),
            &declared(Some("Toyota Supra"), None),
        );
        assert_eq!(v.reasons, vec![ValidationReason::BrandMismatch]);
    }

    #[test]
    fn test_missing_values_skip_checks() {
        let v = validate(Some(&summary(None, None)), &declared(Some("Audi"), Some("2019")));
        assert_eq!(v.verdict, Verdict::Ok);

        let v = validate(Some(&summary(Some("BMW"), Some(2019))), &declared(None, Some("")));
        assert_eq!(v.verdict, Verdict::Ok);
    }

    #[test]
    fn test_no_summary_is_unknown() {
        let v = validate(None, &declared(Some("Audi"), None));
        assert_eq!(v.verdict, Verdict::Unknown);
        assert_eq!(v.reasons, vec![ValidationReason::NoSummary]);
    }

    #[test]
    fn test_verdict_serialization() {
        let v = validate(
            Some(&summary(Some("BMW"), Some(2019))),
            &declared(Some("Audi"), Some("2019")),
        );
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"verdict": "mismatch", "reasons": ["brand-mismatch"]})
        );
    }
}
