//! SACCADE - Scope-Aligned Capture Control And DAQ Engine
//!
//! Experiment lifecycle state machine for scope-synchronized eye
//! tracking. Processes frames through phases:
//! Idle -> Armed -> Recording -> Stopping, with an orthogonal
//! Calibrating window for baseline centering.
//!
//! Each camera frame is mapped to an analog sample and written to the
//! DAQ; while recording, frames are stamped with the relative scope
//! frame counter and handed to the recording sink together with a
//! telemetry record. A periodic watchdog tick detects a stalled scope
//! counter and drives the stop transition.

use ndarray::ArrayView2;
use shared::camera::Timestamp;
use shared::daq::AnalogOutput;
use shared::detector::PupilDetection;
use shared::frame_stamp::encode_scope_frame;
use shared::subject::SubjectParameters;
use shared::telemetry::{AnalogSample, TelemetryRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub mod calibration;
pub mod callback;
pub mod config;
pub mod error;
pub mod mapper;
pub mod sink;
pub mod state;
pub mod watchdog;

use crate::calibration::CalibrationRecorder;
use crate::callback::{CallbackId, LifecycleCallback, LifecycleCallbackEvent};
use crate::sink::RecordingSink;

// Re-export commonly used types for external use
pub use crate::config::{LifecycleConfig, StartMode};
pub use crate::error::LifecycleError;
pub use crate::state::{LifecyclePhase, OperatorEvent, ScopeCounterState};
pub use shared::camera::SensorRoi;

/// Scope-synchronized experiment lifecycle controller.
///
/// Owns the coordinate mapper, the calibration recorder, and the scope
/// counter state; drives the analog output and the recording sink.
pub struct ExperimentLifecycle<D: AnalogOutput, S: RecordingSink> {
    /// Current phase
    phase: LifecyclePhase,
    /// Engine configuration
    config: LifecycleConfig,
    /// Active subject parameters (center, gain, ROI geometry)
    parameters: SubjectParameters,
    /// Baseline recorder for the centering window
    calibration: CalibrationRecorder,
    /// Scope counter snapshots; only this engine mutates them
    counter: ScopeCounterState,
    /// Candidate ROI from the last centering window, for operator review
    candidate_roi: Option<SensorRoi>,
    /// Frame index within the running experiment
    frame_index: u64,
    /// Total frames processed since construction
    frames_seen: u64,
    /// Frame count captured at the previous watchdog tick
    frames_at_last_tick: u64,
    /// Wall-clock start of the running experiment
    recording_started_at: Option<Instant>,
    /// Whether the aux-channel failure warning has been emitted
    aux_warned: bool,
    /// Analog output collaborator
    daq: D,
    /// Recording destination collaborator
    sink: S,
    /// Registered callbacks
    callbacks: Arc<Mutex<HashMap<CallbackId, LifecycleCallback>>>,
    /// Next callback ID
    next_callback_id: Arc<Mutex<CallbackId>>,
}

impl<D: AnalogOutput, S: RecordingSink> ExperimentLifecycle<D, S> {
    /// Create a new lifecycle controller in the Idle phase.
    pub fn new(config: LifecycleConfig, parameters: SubjectParameters, daq: D, sink: S) -> Self {
        Self {
            phase: LifecyclePhase::Idle,
            config,
            parameters,
            calibration: CalibrationRecorder::new(),
            counter: ScopeCounterState::default(),
            candidate_roi: None,
            frame_index: 0,
            frames_seen: 0,
            frames_at_last_tick: 0,
            recording_started_at: None,
            aux_warned: false,
            daq,
            sink,
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            next_callback_id: Arc::new(Mutex::new(0)),
        }
    }

    /// Register a callback for lifecycle events
    pub fn register_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&LifecycleCallbackEvent) + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.lock().unwrap();
        let mut next_id = self.next_callback_id.lock().unwrap();

        let callback_id = *next_id;
        *next_id += 1;

        callbacks.insert(callback_id, Arc::new(callback));
        callback_id
    }

    /// Deregister a callback
    pub fn deregister_callback(&self, callback_id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.lock().unwrap();
        callbacks.remove(&callback_id).is_some()
    }

    /// Emit an event to all registered callbacks
    fn emit_event(&self, event: &LifecycleCallbackEvent) {
        let callbacks = self.callbacks.lock().unwrap();
        for callback in callbacks.values() {
            callback(event);
        }
    }

    /// Process one camera frame.
    ///
    /// Runs the coordinate mapper and writes the analog sample on every
    /// frame regardless of phase; a missing detection produces the
    /// no-signal sentinel and never interrupts anything. While recording,
    /// the frame is stamped with the relative scope counter and handed to
    /// the sink together with a telemetry record.
    ///
    /// `scope_counter` is the caller's latest reading of the hardware
    /// edge counter.
    pub fn process_frame(
        &mut self,
        frame: ArrayView2<'_, u8>,
        detection: Option<PupilDetection>,
        scope_counter: u32,
        timestamp: Timestamp,
    ) -> Result<AnalogSample, LifecycleError> {
        self.frames_seen += 1;

        if scope_counter < self.counter.current {
            log::warn!(
                "scope counter moved backwards ({} -> {}), resyncing",
                self.counter.current,
                scope_counter
            );
        }
        let delta = scope_counter.saturating_sub(self.counter.current);
        self.counter.current = scope_counter;

        // A stop requested by the watchdog is finalized on the frame path,
        // keeping the tick handler's critical section short.
        if self.phase == LifecyclePhase::Stopping {
            self.finish_stop()?;
        }

        let sample = mapper::map_detection(
            detection,
            self.parameters.center(),
            self.parameters.voltage_gain,
        );
        if detection.is_none() {
            log::trace!("no pupil detected this frame");
        }

        self.daq.write_position(sample.x_volts, sample.y_volts)?;
        if let Err(e) = self.daq.write_aux(sample.area_volts, sample.detected_volts) {
            if !self.aux_warned {
                log::warn!(
                    "aux analog output unavailable, continuing without area/detected channels: {e}"
                );
                self.aux_warned = true;
            }
        }

        match self.phase {
            LifecyclePhase::Calibrating { .. } => {
                if let Some(detection) = detection {
                    self.calibration.sample(detection.x, detection.y);
                }
            }
            LifecyclePhase::Armed => {
                if delta > 0 {
                    log::info!("scope started, starting experiment");
                    self.start_recording()?;
                    self.record_frame(frame, detection, sample, timestamp)?;
                }
            }
            LifecyclePhase::Recording => {
                self.record_frame(frame, detection, sample, timestamp)?;
            }
            LifecyclePhase::Idle | LifecyclePhase::Stopping => {}
        }

        Ok(sample)
    }

    /// Handle one edge-triggered operator event.
    pub fn handle_operator(&mut self, event: OperatorEvent) -> Result<(), LifecycleError> {
        match event {
            OperatorEvent::Arm => self.handle_arm(),
            OperatorEvent::Disarm => self.handle_disarm(),
            OperatorEvent::ToggleCentering => self.handle_toggle_centering(),
            OperatorEvent::SetGain(gain) => self.handle_set_gain(gain),
            OperatorEvent::SetRoi(roi) => self.handle_set_roi(roi),
            OperatorEvent::ToggleSaveImages => {
                self.config.save_images = !self.config.save_images;
                log::info!("save images set to {}", self.config.save_images);
                Ok(())
            }
        }
    }

    /// Periodic watchdog tick.
    ///
    /// Samples frame and counter progress; if the scope counter did not
    /// advance across a full period while recording, requests a stop. The
    /// stop itself is finalized on the next frame-path entry.
    pub fn watchdog_tick(&mut self) {
        let frames = self.frames_seen - self.frames_at_last_tick;
        log::debug!("processed {frames} frames since last watchdog tick");

        if self.phase == LifecyclePhase::Recording {
            log::debug!("scope frame counter: {}", self.counter.current);

            let stalled = self.counter.current == self.counter.at_last_tick;
            if stalled && self.config.start_mode == StartMode::ScopeTrigger {
                log::info!(
                    "scope frame counter stalled at {}, stopping experiment",
                    self.counter.current
                );
                self.phase = LifecyclePhase::Stopping;
                self.emit_event(&LifecycleCallbackEvent::ScopeStalled {
                    scope_counter: self.counter.current,
                });
            }
        }

        self.counter.at_last_tick = self.counter.current;
        self.frames_at_last_tick = self.frames_seen;
    }

    fn handle_arm(&mut self) -> Result<(), LifecycleError> {
        if self.phase != LifecyclePhase::Idle {
            return Err(LifecycleError::InvalidState {
                operation: "arm",
                phase: self.phase,
            });
        }

        self.phase = LifecyclePhase::Armed;
        self.counter.at_last_tick = self.counter.current;
        log::info!("armed, waiting for scope frame counter");

        if self.config.start_mode == StartMode::Immediate {
            log::info!("immediate start mode, starting experiment");
            self.start_recording()?;
        }
        Ok(())
    }

    fn handle_disarm(&mut self) -> Result<(), LifecycleError> {
        match self.phase {
            LifecyclePhase::Recording | LifecyclePhase::Stopping => {
                self.finish_stop()?;
            }
            LifecyclePhase::Calibrating { .. } => {
                self.calibration.abort();
            }
            LifecyclePhase::Armed => {}
            LifecyclePhase::Idle => {
                return Err(LifecycleError::InvalidState {
                    operation: "disarm",
                    phase: self.phase,
                });
            }
        }

        self.phase = LifecyclePhase::Idle;
        log::info!("disarmed");
        Ok(())
    }

    fn handle_toggle_centering(&mut self) -> Result<(), LifecycleError> {
        match self.phase {
            LifecyclePhase::Recording | LifecyclePhase::Stopping => {
                Err(LifecycleError::InvalidState {
                    operation: "centering",
                    phase: self.phase,
                })
            }
            LifecyclePhase::Calibrating { resume_armed } => {
                let (cx, cy) = self.calibration.end()?;
                self.parameters.center_x_pix = cx;
                self.parameters.center_y_pix = cy;
                log::info!("finished gaze recording for centering, center = ({cx:.1}, {cy:.1})");
                self.emit_event(&LifecycleCallbackEvent::CenterUpdated {
                    center_x_pix: cx,
                    center_y_pix: cy,
                });

                if self.config.adjust_roi {
                    let roi = calibration::candidate_roi(
                        (cx, cy),
                        self.parameters.width,
                        self.parameters.height,
                    );
                    log::info!(
                        "candidate ROI from center: offset ({}, {}), {}x{}",
                        roi.offset_x,
                        roi.offset_y,
                        roi.width,
                        roi.height
                    );
                    self.candidate_roi = Some(roi);
                    self.emit_event(&LifecycleCallbackEvent::CandidateRoi { roi });
                }

                self.phase = if resume_armed {
                    LifecyclePhase::Armed
                } else {
                    LifecyclePhase::Idle
                };
                Ok(())
            }
            LifecyclePhase::Idle | LifecyclePhase::Armed => {
                let resume_armed = self.phase == LifecyclePhase::Armed;
                self.calibration.begin();
                self.phase = LifecyclePhase::Calibrating { resume_armed };
                log::info!("started gaze recording for centering");
                Ok(())
            }
        }
    }

    fn handle_set_gain(&mut self, gain: f64) -> Result<(), LifecycleError> {
        if !gain.is_finite() || gain <= 0.0 {
            return Err(LifecycleError::InvalidGain(gain));
        }
        self.parameters.voltage_gain = gain;
        log::info!("voltage gain set to {gain}");
        Ok(())
    }

    fn handle_set_roi(&mut self, roi: SensorRoi) -> Result<(), LifecycleError> {
        if matches!(
            self.phase,
            LifecyclePhase::Recording | LifecyclePhase::Stopping
        ) {
            return Err(LifecycleError::InvalidState {
                operation: "ROI change",
                phase: self.phase,
            });
        }
        if !roi.is_aligned() {
            return Err(LifecycleError::MisalignedRoi {
                offset_x: roi.offset_x,
                offset_y: roi.offset_y,
            });
        }

        self.parameters.offset_x = roi.offset_x;
        self.parameters.offset_y = roi.offset_y;
        self.parameters.width = roi.width;
        self.parameters.height = roi.height;
        log::info!(
            "ROI set to offset ({}, {}), {}x{}",
            roi.offset_x,
            roi.offset_y,
            roi.width,
            roi.height
        );
        Ok(())
    }

    fn start_recording(&mut self) -> Result<(), LifecycleError> {
        self.counter.at_experiment_start = self.counter.current;
        self.frame_index = 0;
        self.recording_started_at = Some(Instant::now());
        self.sink.open(&self.parameters)?;
        self.phase = LifecyclePhase::Recording;
        self.emit_event(&LifecycleCallbackEvent::ExperimentStarted {
            scope_counter_at_start: self.counter.at_experiment_start,
        });
        Ok(())
    }

    fn record_frame(
        &mut self,
        frame: ArrayView2<'_, u8>,
        detection: Option<PupilDetection>,
        sample: AnalogSample,
        timestamp: Timestamp,
    ) -> Result<(), LifecycleError> {
        let scope_frame = self.counter.current - self.counter.at_experiment_start;

        if self.config.save_images {
            let mut stamped = frame.to_owned();
            encode_scope_frame(scope_frame, &mut stamped)?;
            self.sink
                .write_frame(&stamped, self.frame_index, scope_frame)?;
        }

        let record = TelemetryRecord {
            frame_index: self.frame_index,
            scope_frame,
            pixel: detection.map(|d| (d.x, d.y)),
            sample,
            timestamp,
        };
        self.sink.append_record(&record)?;

        self.frame_index += 1;
        Ok(())
    }

    fn finish_stop(&mut self) -> Result<(), LifecycleError> {
        let short = self
            .recording_started_at
            .map(|started| started.elapsed() < self.config.short_session_threshold)
            .unwrap_or(false);
        let frames_recorded = self.frame_index;

        log::info!("ending experiment after {frames_recorded} frames (short: {short})");
        self.sink.close(short)?;

        self.counter.at_experiment_start = self.counter.current;
        self.recording_started_at = None;
        self.aux_warned = false;
        self.phase = LifecyclePhase::Armed;
        self.emit_event(&LifecycleCallbackEvent::ExperimentStopped {
            short,
            frames_recorded,
        });
        Ok(())
    }

    /// Get the current phase
    pub fn phase(&self) -> &LifecyclePhase {
        &self.phase
    }

    /// Get the active subject parameters
    pub fn parameters(&self) -> &SubjectParameters {
        &self.parameters
    }

    /// Candidate ROI derived from the last centering window, if any
    pub fn candidate_roi(&self) -> Option<SensorRoi> {
        self.candidate_roi
    }

    /// Latest scope counter reading
    pub fn scope_counter(&self) -> u32 {
        self.counter.current
    }

    /// Scope counter relative to the running experiment's start
    pub fn relative_scope_frame(&self) -> u32 {
        self.counter.current - self.counter.at_experiment_start
    }

    /// Total frames processed since construction
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Access the analog output collaborator
    pub fn daq(&self) -> &D {
        &self.daq
    }

    /// Access the recording sink collaborator
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Engine configuration
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }
}
