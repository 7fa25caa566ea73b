//! Mock camera for testing

use super::{CameraError, CameraResult, EyeCamera, FrameMetadata, SensorRoi, Timestamp};
use ndarray::Array2;
use std::time::Duration;

/// Scripted camera double.
///
/// Plays back a fixed list of frames; a single-frame script repeats
/// indefinitely. Frame timestamps advance by the configured frame period.
pub struct MockCamera {
    frames: Vec<Array2<u8>>,
    frame_index: usize,
    frame_number: u64,
    frame_period: Duration,
    roi: Option<SensorRoi>,
    sensor_size: (u32, u32),
}

impl MockCamera {
    /// Create a mock camera that plays the given frames in order.
    pub fn new(frames: Vec<Array2<u8>>) -> Self {
        let sensor_size = frames
            .first()
            .map(|f| (f.ncols() as u32, f.nrows() as u32))
            .unwrap_or((640, 480));
        Self {
            frames,
            frame_index: 0,
            frame_number: 0,
            frame_period: Duration::from_millis(10),
            roi: None,
            sensor_size,
        }
    }

    /// Create a mock camera that returns the same frame repeatedly.
    pub fn new_repeating(frame: Array2<u8>) -> Self {
        Self::new(vec![frame])
    }

    /// Rewind the script to the first frame.
    pub fn reset(&mut self) {
        self.frame_index = 0;
        self.frame_number = 0;
    }
}

impl EyeCamera for MockCamera {
    fn grab(&mut self) -> CameraResult<(Array2<u8>, FrameMetadata)> {
        let frame = if self.frames.len() == 1 {
            self.frames[0].clone()
        } else {
            let frame = self
                .frames
                .get(self.frame_index)
                .ok_or_else(|| CameraError::Capture("no more scripted frames".into()))?
                .clone();
            self.frame_index += 1;
            frame
        };

        let metadata = FrameMetadata {
            frame_number: self.frame_number,
            timestamp: Timestamp::from_duration(self.frame_period * self.frame_number as u32),
            roi: self.roi,
        };
        self.frame_number += 1;
        Ok((frame, metadata))
    }

    fn set_roi(&mut self, roi: SensorRoi) -> CameraResult<()> {
        roi.validate_for_sensor(self.sensor_size.0, self.sensor_size.1)?;
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
        self.sensor_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeating_frames() {
        let mut camera = MockCamera::new_repeating(Array2::from_elem((4, 4), 7u8));
        for expected in 0..3u64 {
            let (frame, metadata) = camera.grab().unwrap();
            assert_eq!(frame[[0, 0]], 7);
            assert_eq!(metadata.frame_number, expected);
        }
    }

    #[test]
    fn test_script_exhaustion() {
        let mut camera = MockCamera::new(vec![
            Array2::from_elem((4, 4), 1u8),
            Array2::from_elem((4, 4), 2u8),
        ]);
        assert_eq!(camera.grab().unwrap().0[[0, 0]], 1);
        assert_eq!(camera.grab().unwrap().0[[0, 0]], 2);
        assert!(camera.grab().is_err());
    }

    #[test]
    fn test_roi_tracking() {
        let mut camera = MockCamera::new_repeating(Array2::zeros((480, 640)));
        assert!(camera.roi().is_none());

        let roi = SensorRoi {
            offset_x: 64,
            offset_y: 32,
            width: 192,
            height: 192,
        };
        camera.set_roi(roi).unwrap();
        assert_eq!(camera.roi(), Some(roi));

        camera.clear_roi().unwrap();
        assert!(camera.roi().is_none());
    }
}
