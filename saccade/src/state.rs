use serde::{Deserialize, Serialize};

/// Lifecycle phases of a scope-synchronized recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// Not armed; frames are mapped and output but nothing is recorded
    Idle,
    /// Collecting baseline gaze samples for the calibration center
    Calibrating {
        /// Whether to return to Armed (true) or Idle when the window closes
        resume_armed: bool,
    },
    /// Armed and waiting for the scope frame counter to advance
    Armed,
    /// Scope is running; frames are stamped, saved, and logged
    Recording,
    /// Stall detected; the recording is finalized on the next frame
    Stopping,
}

/// Discrete operator inputs, delivered edge-triggered
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorEvent {
    /// Enable scope-synchronized recording
    Arm,
    /// Disable scope-synchronized recording, finalizing any open session
    Disarm,
    /// Toggle the calibration baseline window (the "centering" button)
    ToggleCentering,
    /// Set the analog output gain
    SetGain(f64),
    /// Apply a new readout ROI (between experiments only)
    SetRoi(shared::camera::SensorRoi),
    /// Toggle saving of stamped frames
    ToggleSaveImages,
}

/// Scope frame counter snapshots owned by the lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeCounterState {
    /// Latest counter reading
    pub current: u32,
    /// Reading captured when the running experiment started
    pub at_experiment_start: u32,
    /// Reading captured at the previous watchdog tick
    pub at_last_tick: u32,
}
