use crate::models::detection::{Detection, SpeedRange, Summary, VehicleType};
use crate::services::engine::RawEngineOutput;

/// Order in which ranges are tried when the selected one has no time.
const FALLBACK_ORDER: [SpeedRange; 3] = [
    SpeedRange::ZeroToHundredKmh,
    SpeedRange::HundredToTwoHundredKmh,
    SpeedRange::ZeroToSixtyMph,
];

fn seconds_for(raw: &RawEngineOutput, range: SpeedRange) -> Option<f64> {
    match range {
        SpeedRange::ZeroToSixtyMph => raw.best_0_60_s,
        SpeedRange::ZeroToHundredKmh => raw.best_0_100_s,
        SpeedRange::HundredToTwoHundredKmh => raw.best_100_200_s,
    }
    .filter(|s| s.is_finite() && *s >= 0.0)
}

fn to_millis(seconds: f64) -> Option<u64> {
    let ms = (seconds * 1000.0).round();
    (ms.is_finite() && ms >= 0.0).then_some(ms as u64)
}

/// Pick the range a measurement should be reported for.
///
/// Motorcycles are always timed over 0-60mph. For cars the requested range
/// label is matched case-insensitively; with no recognisable request 0-100km/h
/// is preferred when present.
pub fn select_range(raw: &RawEngineOutput, vehicle: VehicleType, requested: &str) -> SpeedRange {
    let requested = requested.to_lowercase();

    let selected = match vehicle {
        VehicleType::Motorcycle => SpeedRange::ZeroToSixtyMph,
        VehicleType::Car if requested.contains("100-200") || requested.contains("0-200") => {
            SpeedRange::HundredToTwoHundredKmh
        }
        VehicleType::Car if requested.contains("0-100") => SpeedRange::ZeroToHundredKmh,
        VehicleType::Car => {
            if seconds_for(raw, SpeedRange::ZeroToHundredKmh).is_some() {
                SpeedRange::ZeroToHundredKmh
            } else {
                SpeedRange::ZeroToSixtyMph
            }
        }
    };

    if seconds_for(raw, selected).is_some() {
        return selected;
    }

    FALLBACK_ORDER
        .into_iter()
        .find(|range| seconds_for(raw, *range).is_some())
        .unwrap_or(selected)
}

/// Build the canonical measurement for one engine run.
pub fn normalize(raw: &RawEngineOutput, vehicle: VehicleType, requested: &str) -> Detection {
    let range = select_range(raw, vehicle, requested);

    Detection {
        brand: raw.brand.clone(),
        model: None,
        year: raw.year,
        vehicle_type: vehicle,
        range,
        elapsed_ms: seconds_for(raw, range).and_then(to_millis),
        checkpoints: Vec::new(),
        raw_overlay: raw.raw_text.clone().unwrap_or_default(),
        quarter_mile_ms: raw.quarter_mile_s.filter(|s| s.is_finite()).and_then(to_millis),
        target_speed: range.target_speed(),
    }
}

/// Wrap a detection into the summary clients read.
pub fn summarize(detection: &Detection) -> Summary {
    let error = detection
        .elapsed_ms
        .is_none()
        .then(|| format!("No time detected for requested range: {}", detection.range));

    Summary {
        range: detection.range.label().to_string(),
        brand: detection.brand.clone(),
        model: detection.model.clone(),
        year: detection.year,
        best_elapsed_ms: detection.elapsed_ms,
        quarter_mile_ms: detection.quarter_mile_ms,
        all_results: None,
        error,
    }
}
