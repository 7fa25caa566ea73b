use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a recording is started once the engine is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartMode {
    /// Start when the scope frame counter first advances; stop when it
    /// stalls across a full watchdog period.
    ScopeTrigger,
    /// Start immediately on arming. The stall watchdog does not stop
    /// the recording in this mode; only the operator does.
    Immediate,
}

/// Configuration for the experiment lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Recording start discipline
    pub start_mode: StartMode,
    /// Whether stamped frames are handed to the recording sink
    pub save_images: bool,
    /// Whether closing a calibration window also derives a candidate ROI
    pub adjust_roi: bool,
    /// Watchdog sampling period
    pub watchdog_period: Duration,
    /// Recordings shorter than this are marked short-lived on close
    pub short_session_threshold: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_mode: StartMode::ScopeTrigger,
            save_images: true,
            adjust_roi: true,
            watchdog_period: Duration::from_secs(1),
            short_session_threshold: Duration::from_secs(300),
        }
    }
}
