//! Baseline gaze recording and calibration center estimation.
//!
//! While the operator holds the centering window open, every detected
//! pupil position is accumulated; closing the window reduces the samples
//! to a per-axis median. The median is used rather than the mean so
//! transient detection outliers and saccades during the baseline window
//! do not drag the center.

use crate::error::LifecycleError;
use shared::camera::{SensorRoi, ROI_H_ALIGNMENT, ROI_V_ALIGNMENT};

/// Accumulates pixel samples over an operator-controlled baseline window.
#[derive(Debug, Default)]
pub struct CalibrationRecorder {
    xs: Vec<f64>,
    ys: Vec<f64>,
    recording_baseline: bool,
}

impl CalibrationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the baseline window, discarding any previous samples.
    pub fn begin(&mut self) {
        self.xs.clear();
        self.ys.clear();
        self.recording_baseline = true;
    }

    /// Append one detected pixel position. Only meaningful while the
    /// window is open.
    pub fn sample(&mut self, px: f64, py: f64) {
        self.xs.push(px);
        self.ys.push(py);
    }

    pub fn is_recording(&self) -> bool {
        self.recording_baseline
    }

    pub fn sample_count(&self) -> usize {
        self.xs.len()
    }

    /// Close the window and reduce the samples to a center estimate.
    ///
    /// Closing an empty window is a caller error; the window stays open
    /// so further samples can still be collected.
    pub fn end(&mut self) -> Result<(f64, f64), LifecycleError> {
        if self.xs.is_empty() {
            return Err(LifecycleError::EmptyBaseline);
        }
        self.recording_baseline = false;

        let cx = median(std::mem::take(&mut self.xs));
        let cy = median(std::mem::take(&mut self.ys));
        Ok((cx, cy))
    }

    /// Discard the window without producing a center.
    pub fn abort(&mut self) {
        self.xs.clear();
        self.ys.clear();
        self.recording_baseline = false;
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| {
        a.partial_cmp(b)
            .expect("pixel coordinates should be finite")
    });
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Derive a readout ROI centered on the calibration center.
///
/// Offsets snap to the sensor readout grid (horizontal multiples of 8,
/// vertical multiples of 2), rounding half away from zero; width and
/// height carry over unchanged. The result may fall off the sensor and
/// must be validated before being applied to hardware.
pub fn candidate_roi(center: (f64, f64), width: u32, height: u32) -> SensorRoi {
    let h_align = ROI_H_ALIGNMENT as f64;
    let v_align = ROI_V_ALIGNMENT as f64;

    let offset_x = (h_align * ((center.0 - width as f64 / 2.0) / h_align).round()) as i64;
    let offset_y = (v_align * ((center.1 - height as f64 / 2.0) / v_align).round()) as i64;

    SensorRoi {
        offset_x,
        offset_y,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_center() {
        let mut recorder = CalibrationRecorder::new();
        recorder.begin();
        recorder.sample(10.0, 20.0);
        recorder.sample(12.0, 22.0);
        recorder.sample(14.0, 24.0);
        assert_eq!(recorder.end().unwrap(), (12.0, 22.0));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_median_robust_to_outlier() {
        let mut recorder = CalibrationRecorder::new();
        recorder.begin();
        for _ in 0..10 {
            recorder.sample(100.0, 50.0);
        }
        // one wild saccade should not move the center
        recorder.sample(4000.0, -700.0);
        assert_eq!(recorder.end().unwrap(), (100.0, 50.0));
    }

    #[test]
    fn test_even_count_averages_middles() {
        let mut recorder = CalibrationRecorder::new();
        recorder.begin();
        recorder.sample(10.0, 0.0);
        recorder.sample(20.0, 0.0);
        assert_eq!(recorder.end().unwrap().0, 15.0);
    }

    #[test]
    fn test_empty_window_is_an_error() {
        let mut recorder = CalibrationRecorder::new();
        recorder.begin();
        assert!(matches!(recorder.end(), Err(LifecycleError::EmptyBaseline)));
        // the window stays open so the operator can keep sampling
        assert!(recorder.is_recording());
    }

    #[test]
    fn test_begin_clears_previous_samples() {
        let mut recorder = CalibrationRecorder::new();
        recorder.begin();
        recorder.sample(1.0, 1.0);
        recorder.begin();
        assert_eq!(recorder.sample_count(), 0);
        assert!(matches!(recorder.end(), Err(LifecycleError::EmptyBaseline)));
    }

    #[test]
    fn test_candidate_roi_snapping() {
        // center (100, 50) with a 192x192 window:
        //   offset_x = 8 * round((100 - 96) / 8) = 8 * round(0.5) = 8
        //   offset_y = 2 * round((50 - 96) / 2)  = 2 * (-23)      = -46
        let roi = candidate_roi((100.0, 50.0), 192, 192);
        assert_eq!(roi.offset_x, 8);
        assert_eq!(roi.offset_y, -46);
        assert_eq!(roi.width, 192);
        assert_eq!(roi.height, 192);
        assert!(roi.is_aligned());
    }

    #[test]
    fn test_candidate_roi_centered() {
        let roi = candidate_roi((320.0, 240.0), 192, 192);
        assert_eq!(roi.offset_x, 224);
        assert_eq!(roi.offset_y, 144);
        assert!(roi.is_aligned());
    }
}
