//! Pure mapping from pupil detections to analog output voltages.

use shared::detector::PupilDetection;
use shared::telemetry::AnalogSample;

/// Analog output rail, in volts.
pub const VOLT_LIMIT: f64 = 10.0;

/// Fixed detected-flag levels. Two-state signal, never clamped.
pub const DETECTED_VOLTS: f64 = 5.0;
pub const NOT_DETECTED_VOLTS: f64 = -5.0;

/// Saturate a voltage into the output rail.
pub fn clip(volts: f64) -> f64 {
    volts.clamp(-VOLT_LIMIT, VOLT_LIMIT)
}

/// Map a detection to an analog sample.
///
/// One hundred pixels of displacement from the calibration center maps to
/// the full 10 V at gain 1. Image rows grow downward while output Y grows
/// upward, so the Y term is inverted. An average pupil radius of 100 px
/// maps to 0 V on the area channel, with the ±10 V range spanning
/// 0-200 px. A missing detection produces the fixed no-signal sentinel.
///
/// Deterministic and allocation-free; safe to call at frame rate.
pub fn map_detection(
    detection: Option<PupilDetection>,
    center: (f64, f64),
    gain: f64,
) -> AnalogSample {
    let Some(detection) = detection else {
        return AnalogSample::NO_SIGNAL;
    };

    let x_volts = clip(((detection.x - center.0) * gain / 100.0) * 10.0);
    let y_volts = clip(((center.1 - detection.y) * gain / 100.0) * 10.0);
    let area_volts = clip((detection.mean_radius() / 100.0) * 20.0 - 10.0);

    AnalogSample {
        x_volts,
        y_volts,
        area_volts,
        detected_volts: DETECTED_VOLTS,
    }
}
