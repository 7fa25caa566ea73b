//! Disk-backed recording sessions.
//!
//! Each recording session gets its own dated directory under the output
//! root, holding a JSON-lines log (a typed header record followed by one
//! telemetry record per frame) and a `Frames/` subdirectory of stamped
//! PNGs. Sessions that end before the short-session threshold are renamed
//! with a `_less5min` suffix so offline tooling can skip them.

use chrono::Utc;
use saccade::sink::{RecordingSink, SinkError};
use serde::Serialize;
use shared::frame_writer::FrameWriterHandle;
use shared::subject::SubjectParameters;
use shared::telemetry::TelemetryRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Suffix appended to session directories that closed early.
pub const SHORT_SESSION_SUFFIX: &str = "_less5min";

/// Rig identifier embedded in session directory and log file names.
const RIG_LABEL: &str = "EyeRig";

/// First line of every session log.
#[derive(Serialize)]
struct SessionHeader<'a> {
    parameters: &'a SubjectParameters,
    started_utc: String,
}

struct OpenSession {
    session_dir: PathBuf,
    frames_dir: PathBuf,
    log: BufWriter<File>,
    writer: FrameWriterHandle,
    dropped_frames: u64,
}

/// Recording sink that persists sessions to disk.
pub struct DiskSession {
    output_root: PathBuf,
    writer_workers: usize,
    writer_queue: usize,
    open: Option<OpenSession>,
}

impl DiskSession {
    pub fn new(output_root: PathBuf) -> Self {
        Self {
            output_root,
            writer_workers: 2,
            writer_queue: 64,
            open: None,
        }
    }

    /// Override the frame writer pool size and queue depth.
    pub fn with_writer_pool(mut self, workers: usize, queue: usize) -> Self {
        self.writer_workers = workers;
        self.writer_queue = queue;
        self
    }

    /// Directory of the currently open session, if any.
    pub fn session_dir(&self) -> Option<&PathBuf> {
        self.open.as_ref().map(|open| &open.session_dir)
    }
}

impl RecordingSink for DiskSession {
    fn open(&mut self, parameters: &SubjectParameters) -> Result<(), SinkError> {
        if self.open.is_some() {
            return Err(SinkError::AlreadyOpen);
        }

        let (animal, view) = parameters.animal_and_view();
        let now = Utc::now();
        let datestr = now.format("%Y%m%dd").to_string();
        let timestr = now.format("%H%M%StUTC").to_string();

        let session_name = format!("{timestr}_{RIG_LABEL}_{view}");
        let session_dir = self
            .output_root
            .join(animal)
            .join(&datestr)
            .join(&session_name);
        let frames_dir = session_dir.join("Frames");
        std::fs::create_dir_all(&frames_dir)?;

        let log_path = session_dir.join(format!("{session_name}.json"));
        let mut log = BufWriter::new(File::create(&log_path)?);

        let header = SessionHeader {
            parameters,
            started_utc: now.to_rfc3339(),
        };
        serde_json::to_writer(&mut log, &header)?;
        log.write_all(b"\n")?;

        info!("opened recording session at {}", session_dir.display());

        self.open = Some(OpenSession {
            session_dir,
            frames_dir,
            log,
            writer: FrameWriterHandle::new(self.writer_workers, self.writer_queue),
            dropped_frames: 0,
        });
        Ok(())
    }

    fn write_frame(
        &mut self,
        frame: &ndarray::Array2<u8>,
        frame_index: u64,
        scope_frame: u32,
    ) -> Result<(), SinkError> {
        let open = self.open.as_mut().ok_or(SinkError::NotOpen)?;

        let filename = format!("{frame_index:09}_scopeframe_{scope_frame:06}.png");
        let filepath = open.frames_dir.join(filename);

        // A full writer queue drops the frame rather than stalling the
        // frame path; the telemetry record is still appended by the engine.
        if let Err(e) = open.writer.write_frame(frame, filepath) {
            open.dropped_frames += 1;
            warn!("frame writer behind, dropping frame {frame_index}: {e}");
        }
        Ok(())
    }

    fn append_record(&mut self, record: &TelemetryRecord) -> Result<(), SinkError> {
        let open = self.open.as_mut().ok_or(SinkError::NotOpen)?;
        serde_json::to_writer(&mut open.log, record)?;
        open.log.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self, short_session: bool) -> Result<(), SinkError> {
        let mut open = self.open.take().ok_or(SinkError::NotOpen)?;

        open.log.flush()?;
        drop(open.log);
        open.writer.wait_for_completion();

        if open.dropped_frames > 0 {
            warn!("{} frames were dropped by the writer queue", open.dropped_frames);
        }

        if short_session {
            let name = open
                .session_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let renamed = open
                .session_dir
                .with_file_name(format!("{name}{SHORT_SESSION_SUFFIX}"));
            std::fs::rename(&open.session_dir, &renamed)?;
            info!("closed short session, renamed to {}", renamed.display());
        } else {
            info!("closed session at {}", open.session_dir.display());
        }
        Ok(())
    }
}
