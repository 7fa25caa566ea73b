use shared::camera::SensorRoi;
use std::sync::Arc;

/// Events emitted for external callbacks
#[derive(Debug, Clone)]
pub enum LifecycleCallbackEvent {
    /// A scope-triggered recording has opened
    ExperimentStarted {
        /// Absolute counter reading captured at the start
        scope_counter_at_start: u32,
    },
    /// A recording has been finalized
    ExperimentStopped {
        /// Whether the session was marked short-lived
        short: bool,
        /// Frames recorded during the session
        frames_recorded: u64,
    },
    /// Closing a baseline window produced a new calibration center
    CenterUpdated { center_x_pix: f64, center_y_pix: f64 },
    /// A candidate readout ROI was derived from the new center
    CandidateRoi { roi: SensorRoi },
    /// The watchdog observed a stalled scope counter
    ScopeStalled { scope_counter: u32 },
}

/// Callback ID for registration/deregistration
pub type CallbackId = u64;

/// Callback function type
pub type LifecycleCallback = Arc<dyn Fn(&LifecycleCallbackEvent) + Send + Sync>;
