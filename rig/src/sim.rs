//! Simulated eye camera, detector, and scope counter for bench runs.
//!
//! The camera renders a dark pupil disc wandering over a bright
//! background and publishes the ground-truth ellipse; the paired detector
//! reads that truth back with a little jitter and periodic dropouts, so
//! the full pipeline can run with no hardware attached.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::camera::{CameraResult, EyeCamera, FrameMetadata, SensorRoi, Timestamp};
use shared::daq::{DaqError, ScopeCounterInput};
use shared::detector::{PupilDetection, PupilDetector};
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BACKGROUND_LEVEL: u8 = 185;
const PUPIL_LEVEL: u8 = 30;

type SharedTruth = Arc<Mutex<Option<PupilDetection>>>;

/// Synthetic mono8 eye camera.
pub struct SimulatedEye {
    width: u32,
    height: u32,
    frame_number: u64,
    frame_period: Duration,
    roi: Option<SensorRoi>,
    truth: SharedTruth,
}

/// Ground-truth-backed detector paired with a [`SimulatedEye`].
pub struct SimulatedDetector {
    truth: SharedTruth,
    rng: StdRng,
    dropout_every: u64,
    calls: u64,
}

/// Build a camera/detector pair sharing the same ground truth.
pub fn simulated_pair(width: u32, height: u32, fps: f64) -> (SimulatedEye, SimulatedDetector) {
    let truth: SharedTruth = Arc::new(Mutex::new(None));
    let camera = SimulatedEye {
        width,
        height,
        frame_number: 0,
        frame_period: Duration::from_secs_f64(1.0 / fps),
        roi: None,
        truth: truth.clone(),
    };
    let detector = SimulatedDetector {
        truth,
        rng: StdRng::seed_from_u64(17),
        dropout_every: 25,
        calls: 0,
    };
    (camera, detector)
}

impl SimulatedEye {
    fn pupil_at(&self, t: f64) -> PupilDetection {
        let cx = self.width as f64 / 2.0 + 60.0 * (TAU * 0.20 * t).sin();
        let cy = self.height as f64 / 2.0 + 40.0 * (TAU * 0.13 * t).cos();
        let radius = 45.0 + 10.0 * (TAU * 0.05 * t).sin();
        PupilDetection {
            x: cx,
            y: cy,
            minor_radius: radius * 0.9,
            major_radius: radius * 1.1,
        }
    }
}

impl EyeCamera for SimulatedEye {
    fn grab(&mut self) -> CameraResult<(Array2<u8>, FrameMetadata)> {
        let t = self.frame_number as f64 * self.frame_period.as_secs_f64();
        let pupil = self.pupil_at(t);
        let radius = pupil.mean_radius();

        let frame = Array2::from_shape_fn(
            (self.height as usize, self.width as usize),
            |(row, col)| {
                let dx = col as f64 - pupil.x;
                let dy = row as f64 - pupil.y;
                if dx * dx + dy * dy <= radius * radius {
                    PUPIL_LEVEL
                } else {
                    BACKGROUND_LEVEL
                }
            },
        );

        *self.truth.lock().unwrap() = Some(pupil);

        let metadata = FrameMetadata {
            frame_number: self.frame_number,
            timestamp: Timestamp::from_duration(self.frame_period * self.frame_number as u32),
            roi: self.roi,
        };
        self.frame_number += 1;
        Ok((frame, metadata))
    }

    fn set_roi(&mut self, roi: SensorRoi) -> CameraResult<()> {
        roi.validate_for_sensor(self.width, self.height)?;
        self.roi = Some(roi);
        Ok(())
    }

    fn clear_roi(&mut self) -> CameraResult<()> {
        self.roi = None;
        Ok(())
    }

    fn roi(&self) -> Option<SensorRoi> {
        self.roi
    }

    fn sensor_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl PupilDetector for SimulatedDetector {
    fn detect(&mut self, _frame: &ndarray::ArrayView2<u8>) -> Option<PupilDetection> {
        self.calls += 1;
        if self.dropout_every > 0 && self.calls % self.dropout_every == 0 {
            return None;
        }

        let truth = (*self.truth.lock().unwrap())?;
        Some(PupilDetection {
            x: truth.x + self.rng.gen_range(-0.5..0.5),
            y: truth.y + self.rng.gen_range(-0.5..0.5),
            minor_radius: truth.minor_radius,
            major_radius: truth.major_radius,
        })
    }
}

/// Scope counter that runs for a scripted window of reads.
///
/// Reads are 1:1 with camera frames in the rig loop, so the window is
/// expressed in frames: the counter starts advancing at `start_read`,
/// stalls at `stop_read`, and advances by `ticks_per_read` in between.
pub struct SimulatedScope {
    reads: u64,
    start_read: u64,
    stop_read: u64,
    ticks_per_read: u32,
    count: u32,
}

impl SimulatedScope {
    pub fn new(start_read: u64, stop_read: u64, ticks_per_read: u32) -> Self {
        Self {
            reads: 0,
            start_read,
            stop_read,
            ticks_per_read,
            count: 0,
        }
    }
}

impl ScopeCounterInput for SimulatedScope {
    fn read(&mut self) -> Result<u32, DaqError> {
        let idx = self.reads;
        self.reads += 1;
        if idx >= self.start_read && idx < self.stop_read {
            self.count += self.ticks_per_read;
        }
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_contains_pupil() {
        let (mut camera, _) = simulated_pair(320, 240, 60.0);
        let (frame, metadata) = camera.grab().unwrap();

        assert_eq!(frame.dim(), (240, 320));
        assert_eq!(metadata.frame_number, 0);
        assert!(frame.iter().any(|&v| v == PUPIL_LEVEL));
        assert!(frame.iter().any(|&v| v == BACKGROUND_LEVEL));
    }

    #[test]
    fn test_detector_tracks_truth() {
        let (mut camera, mut detector) = simulated_pair(320, 240, 60.0);
        let (frame, _) = camera.grab().unwrap();

        let detection = detector.detect(&frame.view()).unwrap();
        let truth = camera.pupil_at(0.0);
        assert!((detection.x - truth.x).abs() < 1.0);
        assert!((detection.y - truth.y).abs() < 1.0);
    }

    #[test]
    fn test_detector_dropout() {
        let (mut camera, mut detector) = simulated_pair(320, 240, 60.0);
        detector.dropout_every = 3;

        let (frame, _) = camera.grab().unwrap();
        let results: Vec<bool> = (0..6)
            .map(|_| detector.detect(&frame.view()).is_some())
            .collect();
        assert_eq!(results, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn test_detector_none_before_first_frame() {
        let (_, mut detector) = simulated_pair(320, 240, 60.0);
        let frame = Array2::from_elem((240, 320), 0u8);
        assert!(detector.detect(&frame.view()).is_none());
    }

    #[test]
    fn test_scope_window() {
        let mut scope = SimulatedScope::new(2, 5, 2);
        let readings: Vec<u32> = (0..7).map(|_| scope.read().unwrap()).collect();
        assert_eq!(readings, vec![0, 0, 2, 4, 6, 6, 6]);
    }
}
