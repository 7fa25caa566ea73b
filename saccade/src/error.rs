use crate::sink::SinkError;
use crate::state::LifecyclePhase;
use shared::daq::DaqError;
use shared::frame_stamp::StampError;
use thiserror::Error;

/// Errors produced by the experiment lifecycle engine.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Calibration window closed without a single sample.
    #[error("baseline window closed with no samples")]
    EmptyBaseline,

    /// Operation not valid in the current phase.
    #[error("{operation} is not allowed while {phase:?}")]
    InvalidState {
        /// Rejected operation.
        operation: &'static str,
        /// Phase the engine was in.
        phase: LifecyclePhase,
    },

    /// Voltage gain must be positive and finite.
    #[error("invalid voltage gain {0}")]
    InvalidGain(f64),

    /// ROI offsets must sit on the sensor readout grid.
    #[error("ROI offset ({offset_x}, {offset_y}) violates readout alignment")]
    MisalignedRoi { offset_x: i64, offset_y: i64 },

    /// Primary analog output failure.
    #[error(transparent)]
    Daq(#[from] DaqError),

    /// Recording sink failure.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Frame stamping failure.
    #[error(transparent)]
    Stamp(#[from] StampError),
}
