//! Recording destination abstraction.
//!
//! A sink's open/close lifecycle is tied 1:1 to recording sessions: the
//! engine opens it when the scope starts, feeds it stamped frames and
//! telemetry records while recording, and closes it when the scope stalls
//! or the operator disarms.

use ndarray::Array2;
use shared::subject::SubjectParameters;
use shared::telemetry::TelemetryRecord;
use thiserror::Error;

/// Errors produced by recording sinks.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("frame write failed: {0}")]
    Frame(String),

    #[error("sink is not open")]
    NotOpen,

    #[error("sink is already open")]
    AlreadyOpen,
}

/// Destination for one recording session's frames and telemetry.
pub trait RecordingSink: Send {
    /// Open a new session destination, writing the session header.
    fn open(&mut self, parameters: &SubjectParameters) -> Result<(), SinkError>;

    /// Persist one stamped frame.
    fn write_frame(
        &mut self,
        frame: &Array2<u8>,
        frame_index: u64,
        scope_frame: u32,
    ) -> Result<(), SinkError>;

    /// Append one telemetry record to the session log.
    fn append_record(&mut self, record: &TelemetryRecord) -> Result<(), SinkError>;

    /// Finalize the session. `short_session` marks destinations that did
    /// not reach the configured minimum duration.
    fn close(&mut self, short_session: bool) -> Result<(), SinkError>;
}

/// Sink that discards everything. Used when running without persistence
/// and in tests that only exercise the state machine.
#[derive(Debug, Default)]
pub struct NullSink;

impl RecordingSink for NullSink {
    fn open(&mut self, _parameters: &SubjectParameters) -> Result<(), SinkError> {
        Ok(())
    }

    fn write_frame(
        &mut self,
        _frame: &Array2<u8>,
        _frame_index: u64,
        _scope_frame: u32,
    ) -> Result<(), SinkError> {
        Ok(())
    }

    fn append_record(&mut self, _record: &TelemetryRecord) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&mut self, _short_session: bool) -> Result<(), SinkError> {
        Ok(())
    }
}
