//! Camera abstraction layer for the eye-tracking rig.
//!
//! Provides a unified interface for mono8 frame acquisition that can be
//! backed by the bench simulator (for testing) or actual hardware (for
//! production).

pub mod mock;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Horizontal ROI offset granularity of the sensor readout, in pixels.
pub const ROI_H_ALIGNMENT: u32 = 8;
/// Vertical ROI offset granularity of the sensor readout, in pixels.
pub const ROI_V_ALIGNMENT: u32 = 2;

/// Timestamp represented as seconds and nanoseconds since an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds component
    pub seconds: u64,
    /// Nanoseconds component (0-999,999,999)
    pub nanos: u64,
}

impl Timestamp {
    /// Create a new timestamp
    pub fn new(seconds: u64, nanos: u64) -> Self {
        Self { seconds, nanos }
    }

    /// Create a timestamp from a Duration since epoch
    pub fn from_duration(duration: Duration) -> Self {
        let total_nanos = duration.as_nanos();
        let seconds = (total_nanos / 1_000_000_000) as u64;
        let nanos = (total_nanos % 1_000_000_000) as u64;
        Self { seconds, nanos }
    }

    /// Convert to Duration
    pub fn to_duration(&self) -> Duration {
        Duration::new(self.seconds, self.nanos as u32)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// Errors produced by camera operations.
#[derive(Error, Debug)]
pub enum CameraError {
    /// Hardware communication error
    #[error("hardware error: {0}")]
    Hardware(String),

    /// Invalid region of interest
    #[error("invalid ROI: {0}")]
    InvalidRoi(String),

    /// Frame capture error
    #[error("capture error: {0}")]
    Capture(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for camera operations
pub type CameraResult<T> = Result<T, CameraError>;

/// A sensor readout sub-window.
///
/// Offsets are signed: a calibration-derived candidate ROI may fall
/// partially off the sensor, and the operator decides whether to apply it.
/// Any ROI actually handed to hardware must validate against the sensor
/// geometry and offset alignment first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRoi {
    pub offset_x: i64,
    pub offset_y: i64,
    pub width: u32,
    pub height: u32,
}

impl SensorRoi {
    /// ROI covering the whole sensor.
    pub fn full_sensor(width: u32, height: u32) -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            width,
            height,
        }
    }

    /// Check that the offsets sit on the sensor readout grid.
    pub fn is_aligned(&self) -> bool {
        self.offset_x % ROI_H_ALIGNMENT as i64 == 0 && self.offset_y % ROI_V_ALIGNMENT as i64 == 0
    }

    /// Validate that the ROI fits within the given sensor dimensions.
    pub fn validate_for_sensor(&self, sensor_width: u32, sensor_height: u32) -> CameraResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::InvalidRoi("ROI has zero dimensions".into()));
        }

        if self.offset_x < 0 || self.offset_y < 0 {
            return Err(CameraError::InvalidRoi(format!(
                "ROI offset ({}, {}) is off the sensor",
                self.offset_x, self.offset_y
            )));
        }

        if self.offset_x + self.width as i64 > sensor_width as i64
            || self.offset_y + self.height as i64 > sensor_height as i64
        {
            return Err(CameraError::InvalidRoi(format!(
                "ROI extends beyond sensor bounds ({sensor_width}x{sensor_height})"
            )));
        }

        if !self.is_aligned() {
            return Err(CameraError::InvalidRoi(format!(
                "ROI offset ({}, {}) violates readout alignment ({ROI_H_ALIGNMENT}, {ROI_V_ALIGNMENT})",
                self.offset_x, self.offset_y
            )));
        }

        Ok(())
    }
}

/// Metadata returned with each captured frame.
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    /// Frame sequence number since acquisition start
    pub frame_number: u64,
    /// Capture timestamp
    pub timestamp: Timestamp,
    /// ROI the frame was read out with, if one is set
    pub roi: Option<SensorRoi>,
}

/// Trait for unified camera access.
///
/// Abstracts the vendor SDK so the lifecycle can be driven by the bench
/// simulator in tests and by real hardware in production. Frames are mono8
/// grayscale, row-major.
pub trait EyeCamera: Send {
    /// Capture the next frame.
    fn grab(&mut self) -> CameraResult<(Array2<u8>, FrameMetadata)>;

    /// Set the readout ROI for subsequent frames.
    fn set_roi(&mut self, roi: SensorRoi) -> CameraResult<()>;

    /// Clear the ROI and return to full-frame readout.
    fn clear_roi(&mut self) -> CameraResult<()>;

    /// Current ROI, if one is set.
    fn roi(&self) -> Option<SensorRoi>;

    /// Full sensor dimensions as (width, height).
    fn sensor_size(&self) -> (u32, u32);

    /// Offset granularity the sensor supports, as (horizontal, vertical).
    fn roi_offset_alignment(&self) -> (u32, u32) {
        (ROI_H_ALIGNMENT, ROI_V_ALIGNMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roi_validation() {
        let roi = SensorRoi {
            offset_x: 8,
            offset_y: 2,
            width: 192,
            height: 192,
        };
        assert!(roi.validate_for_sensor(640, 480).is_ok());

        // Extends beyond sensor
        let roi = SensorRoi {
            offset_x: 512,
            offset_y: 0,
            width: 192,
            height: 192,
        };
        assert!(roi.validate_for_sensor(640, 480).is_err());

        // Negative offset
        let roi = SensorRoi {
            offset_x: -8,
            offset_y: 0,
            width: 192,
            height: 192,
        };
        assert!(roi.validate_for_sensor(640, 480).is_err());

        // Misaligned offsets
        let roi = SensorRoi {
            offset_x: 4,
            offset_y: 0,
            width: 192,
            height: 192,
        };
        assert!(roi.validate_for_sensor(640, 480).is_err());
        let roi = SensorRoi {
            offset_x: 0,
            offset_y: 3,
            width: 192,
            height: 192,
        };
        assert!(roi.validate_for_sensor(640, 480).is_err());
    }

    #[test]
    fn test_roi_alignment() {
        let aligned = SensorRoi {
            offset_x: 16,
            offset_y: -46,
            width: 192,
            height: 192,
        };
        assert!(aligned.is_aligned());

        let misaligned = SensorRoi {
            offset_x: 12,
            offset_y: -46,
            width: 192,
            height: 192,
        };
        assert!(!misaligned.is_aligned());
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let ts = Timestamp::from_duration(Duration::from_millis(1500));
        assert_eq!(ts.seconds, 1);
        assert_eq!(ts.nanos, 500_000_000);
        assert_eq!(ts.to_duration(), Duration::from_millis(1500));
        assert_eq!(format!("{ts}"), "1.500000000");
    }
}
