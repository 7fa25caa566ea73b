//! Bench-top tracking binary driving the saccade lifecycle engine with
//! simulated hardware.
//!
//! Renders synthetic eye frames, feeds detections and a scripted scope
//! counter through the lifecycle, and records scope-triggered sessions to
//! disk. Useful for exercising the full pipeline with no camera, DAQ, or
//! scope attached.

use anyhow::{Context, Result};
use clap::Parser;
use rig::session::DiskSession;
use rig::sim::{simulated_pair, SimulatedScope};
use saccade::callback::LifecycleCallbackEvent;
use saccade::watchdog::Watchdog;
use saccade::{ExperimentLifecycle, LifecycleConfig, OperatorEvent};
use shared::camera::EyeCamera;
use shared::daq::{NullDaq, ScopeCounterInput};
use shared::detector::PupilDetector;
use shared::subject::SubjectStore;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Scope-synchronized eye tracking against simulated hardware"
)]
struct Args {
    #[arg(short = 'o', long, default_value = "recordings")]
    output_dir: PathBuf,

    #[arg(long, default_value = "Sim_Eye", help = "Subject profile name")]
    subject: String,

    #[arg(long, help = "Directory of subject parameter profiles")]
    profiles_dir: Option<PathBuf>,

    #[arg(long, help = "Override the profile's voltage gain")]
    gain: Option<f64>,

    #[arg(long, default_value = "60.0", help = "Simulated camera frame rate")]
    fps: f64,

    #[arg(long, default_value = "2000", help = "Frames to process before exiting")]
    frames: u64,

    #[arg(long, default_value = "100", help = "Frame at which the scope starts")]
    scope_start_frame: u64,

    #[arg(long, default_value = "1500", help = "Frame at which the scope stalls")]
    scope_stop_frame: u64,

    #[arg(long, default_value = "1", help = "Watchdog period in seconds")]
    watchdog_secs: u64,

    #[arg(long, help = "Disable saving of stamped frames")]
    skip_images: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let store = match &args.profiles_dir {
        Some(dir) => SubjectStore::with_path(dir.clone()),
        None => SubjectStore::new().context("Failed to locate the profile store")?,
    };

    let (sensor_width, sensor_height) = (640, 480);
    let mut parameters = store
        .load_or_default(&args.subject, sensor_width, sensor_height)
        .with_context(|| format!("Failed to load profile {}", args.subject))?;
    if let Some(gain) = args.gain {
        parameters.voltage_gain = gain;
    }
    info!(
        "Subject {}: {}x{} at offset ({}, {}), gain {}",
        parameters.name,
        parameters.width,
        parameters.height,
        parameters.offset_x,
        parameters.offset_y,
        parameters.voltage_gain
    );

    let (mut camera, mut detector) = simulated_pair(parameters.width, parameters.height, args.fps);
    let mut scope = SimulatedScope::new(args.scope_start_frame, args.scope_stop_frame, 1);

    let config = LifecycleConfig {
        save_images: !args.skip_images,
        watchdog_period: Duration::from_secs(args.watchdog_secs),
        ..LifecycleConfig::default()
    };
    let session = DiskSession::new(args.output_dir.clone());

    let lifecycle = Arc::new(Mutex::new(ExperimentLifecycle::new(
        config, parameters, NullDaq, session,
    )));

    let _callback_id = lifecycle.lock().unwrap().register_callback(|event| match event {
        LifecycleCallbackEvent::ExperimentStarted {
            scope_counter_at_start,
        } => {
            info!("EXPERIMENT STARTED - scope counter at start: {scope_counter_at_start}");
        }
        LifecycleCallbackEvent::ExperimentStopped {
            short,
            frames_recorded,
        } => {
            info!("EXPERIMENT STOPPED - {frames_recorded} frames recorded (short: {short})");
        }
        LifecycleCallbackEvent::CenterUpdated {
            center_x_pix,
            center_y_pix,
        } => {
            info!("Calibration center updated: ({center_x_pix:.1}, {center_y_pix:.1})");
        }
        LifecycleCallbackEvent::CandidateRoi { roi } => {
            info!(
                "Candidate ROI: offset ({}, {}), {}x{}",
                roi.offset_x, roi.offset_y, roi.width, roi.height
            );
        }
        LifecycleCallbackEvent::ScopeStalled { scope_counter } => {
            warn!("Scope counter stalled at {scope_counter}");
        }
    });

    info!("Arming scope-triggered recording");
    lifecycle
        .lock()
        .unwrap()
        .handle_operator(OperatorEvent::Arm)
        .context("Failed to arm the lifecycle")?;

    let watchdog_period = lifecycle.lock().unwrap().config().watchdog_period;
    let watchdog_lifecycle = lifecycle.clone();
    let mut watchdog = Watchdog::spawn(watchdog_period, move || {
        watchdog_lifecycle.lock().unwrap().watchdog_tick();
    });

    let frame_period = Duration::from_secs_f64(1.0 / args.fps);
    info!("Entering frame loop for {} frames", args.frames);

    for _ in 0..args.frames {
        let (frame, metadata) = camera
            .grab()
            .map_err(|e| anyhow::anyhow!("Frame capture failed: {e}"))?;
        let detection = detector.detect(&frame.view());
        let counter = scope
            .read()
            .map_err(|e| anyhow::anyhow!("Scope counter read failed: {e}"))?;

        lifecycle
            .lock()
            .unwrap()
            .process_frame(frame.view(), detection, counter, metadata.timestamp)
            .context("Frame processing failed")?;

        std::thread::sleep(frame_period);
    }

    watchdog.cancel();

    let mut guard = lifecycle.lock().unwrap();
    if guard.handle_operator(OperatorEvent::Disarm).is_ok() {
        info!("Disarmed");
    }
    info!(
        "Processed {} frames, final scope counter {}",
        guard.frames_seen(),
        guard.scope_counter()
    );

    Ok(())
}
