//! Pupil detection data model.
//!
//! The ellipse-fitting backend is an external collaborator; the rig only
//! consumes its per-frame result.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// A single pupil fit in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PupilDetection {
    /// Center X in full-frame pixels
    pub x: f64,
    /// Center Y in full-frame pixels (rows grow downward)
    pub y: f64,
    /// Fitted ellipse minor radius in pixels
    pub minor_radius: f64,
    /// Fitted ellipse major radius in pixels
    pub major_radius: f64,
}

impl PupilDetection {
    /// Mean of the two fitted radii.
    pub fn mean_radius(&self) -> f64 {
        (self.minor_radius + self.major_radius) / 2.0
    }
}

/// Per-frame pupil detector.
///
/// Returns `None` when no pupil was found in the frame; that is an
/// expected outcome, not an error.
pub trait PupilDetector: Send {
    fn detect(&mut self, frame: &ArrayView2<u8>) -> Option<PupilDetection>;
}
