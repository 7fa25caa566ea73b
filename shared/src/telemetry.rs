//! Per-frame telemetry payloads shared between the engine and the sinks.

use crate::camera::Timestamp;
use serde::{Deserialize, Serialize};

/// One analog output sample, in volts.
///
/// The x/y/area channels are clamped to the ±10 V output range by the
/// mapper. `detected_volts` is a fixed two-state flag (+5 V detected,
/// -5 V not detected), not a clamped measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalogSample {
    pub x_volts: f64,
    pub y_volts: f64,
    pub area_volts: f64,
    pub detected_volts: f64,
}

impl AnalogSample {
    /// Fault sentinel written when no pupil was detected: pinned to the
    /// negative rail so it is unambiguously outside any calibrated range.
    pub const NO_SIGNAL: AnalogSample = AnalogSample {
        x_volts: -10.0,
        y_volts: -10.0,
        area_volts: -10.0,
        detected_volts: -5.0,
    };

    pub fn is_no_signal(&self) -> bool {
        *self == Self::NO_SIGNAL
    }
}

/// One line of the per-frame recording log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Frame index within the current experiment, starting at 0
    pub frame_index: u64,
    /// Scope frame counter relative to the experiment start; the same
    /// value stamped into the saved frame's pixel block
    pub scope_frame: u32,
    /// Raw pixel coordinates of the detection, if any
    pub pixel: Option<(f64, f64)>,
    /// Analog sample written to the DAQ for this frame
    pub sample: AnalogSample,
    /// Camera capture timestamp
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_signal_sentinel() {
        assert!(AnalogSample::NO_SIGNAL.is_no_signal());
        let ok = AnalogSample {
            x_volts: 0.0,
            y_volts: 0.0,
            area_volts: 0.0,
            detected_volts: 5.0,
        };
        assert!(!ok.is_no_signal());
    }

    #[test]
    fn test_record_json_roundtrip() {
        let record = TelemetryRecord {
            frame_index: 3,
            scope_frame: 17,
            pixel: Some((120.5, 88.25)),
            sample: AnalogSample::NO_SIGNAL,
            timestamp: Timestamp::new(2, 500_000_000),
        };
        let line = serde_json::to_string(&record).unwrap();
        let back: TelemetryRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back.frame_index, 3);
        assert_eq!(back.scope_frame, 17);
        assert_eq!(back.pixel, Some((120.5, 88.25)));
        assert!(back.sample.is_no_signal());
    }
}
