//! Full-pipeline test: simulated camera, detector, and scope counter
//! driving the lifecycle engine into a disk session, then verifying the
//! on-disk artifacts including the pixel-stamped scope counters.

use ndarray::Array2;
use rig::session::{DiskSession, SHORT_SESSION_SUFFIX};
use rig::sim::{simulated_pair, SimulatedScope};
use saccade::{ExperimentLifecycle, LifecycleConfig, LifecyclePhase, OperatorEvent};
use shared::camera::EyeCamera;
use shared::daq::{MemoryDaq, ScopeCounterInput};
use shared::detector::PupilDetector;
use shared::frame_stamp::decode_scope_frame;
use shared::subject::SubjectParameters;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn find_single_dir(path: &Path) -> PathBuf {
    let mut entries: Vec<_> = std::fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1, "expected one entry in {}", path.display());
    entries.pop().unwrap()
}

fn decode_png(path: &Path) -> u32 {
    let img = image::open(path).unwrap().to_luma8();
    let (width, height) = img.dimensions();
    let frame =
        Array2::from_shape_vec((height as usize, width as usize), img.into_raw()).unwrap();
    decode_scope_frame(&frame.view()).unwrap()
}

#[test]
fn test_recorded_session_artifacts() {
    let temp_dir = TempDir::new().unwrap();

    let parameters = SubjectParameters::full_sensor("Ada_Eye", 64, 48);
    let (mut camera, mut detector) = simulated_pair(64, 48, 60.0);
    // counter advances once per frame between frames 3 and 10
    let mut scope = SimulatedScope::new(3, 10, 1);

    let session = DiskSession::new(temp_dir.path().to_path_buf()).with_writer_pool(1, 32);
    let mut lifecycle = ExperimentLifecycle::new(
        LifecycleConfig::default(),
        parameters,
        MemoryDaq::new(),
        session,
    );

    lifecycle.handle_operator(OperatorEvent::Arm).unwrap();

    for i in 0..14u64 {
        let (frame, metadata) = camera.grab().unwrap();
        let detection = detector.detect(&frame.view());
        let counter = scope.read().unwrap();

        lifecycle
            .process_frame(frame.view(), detection, counter, metadata.timestamp)
            .unwrap();

        match i {
            0..=2 => assert_eq!(lifecycle.phase(), &LifecyclePhase::Armed, "frame {i}"),
            3..=12 => assert_eq!(lifecycle.phase(), &LifecyclePhase::Recording, "frame {i}"),
            _ => {}
        }

        if i == 10 {
            // counter has advanced since arming; recording continues
            lifecycle.watchdog_tick();
            assert_eq!(lifecycle.phase(), &LifecyclePhase::Recording);
        }
        if i == 12 {
            // counter pinned at 7 across the full period: stall
            lifecycle.watchdog_tick();
            assert_eq!(lifecycle.phase(), &LifecyclePhase::Stopping);
        }
    }

    // frame 13 finalized the stop
    assert_eq!(lifecycle.phase(), &LifecyclePhase::Armed);

    // every frame drove the analog output, recorded or not
    assert_eq!(lifecycle.daq().positions().len(), 14);

    // session directory: <root>/Ada/<date>/<session>_less5min
    let animal_dir = find_single_dir(temp_dir.path());
    assert!(animal_dir.ends_with("Ada"));
    let date_dir = find_single_dir(&animal_dir);
    let session_dir = find_single_dir(&date_dir);
    let session_name = session_dir.file_name().unwrap().to_str().unwrap();
    assert!(
        session_name.ends_with(SHORT_SESSION_SUFFIX),
        "short run should be marked: {session_name}"
    );
    assert!(session_name.contains("_EyeRig_Eye"));

    // stamped frames decode back to their relative scope counters
    let frames_dir = session_dir.join("Frames");
    let mut frame_files: Vec<PathBuf> = std::fs::read_dir(&frames_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    frame_files.sort();
    assert_eq!(frame_files.len(), 10);

    let decoded: Vec<u32> = frame_files.iter().map(|p| decode_png(p)).collect();
    assert_eq!(decoded, vec![0, 1, 2, 3, 4, 5, 6, 6, 6, 6]);

    // the filename scope field matches the pixel stamp
    for (path, scope_frame) in frame_files.iter().zip(&decoded) {
        let name = path.file_stem().unwrap().to_str().unwrap();
        let (_, name_scope) = name.split_once("_scopeframe_").unwrap();
        assert_eq!(name_scope.parse::<u32>().unwrap(), *scope_frame);
    }

    // log: header plus one record per recorded frame
    let log_name = session_name
        .strip_suffix(SHORT_SESSION_SUFFIX)
        .unwrap()
        .to_string();
    let log_path = session_dir.join(format!("{log_name}.json"));
    let contents = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 11);

    let header: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(header["parameters"]["Name"], "Ada_Eye");
    assert_eq!(header["parameters"]["Width"], 64);

    for (i, line) in lines[1..].iter().enumerate() {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(record["frame_index"], i as u64);
        assert_eq!(record["scope_frame"], decoded[i]);
        // simulator pupil was visible on every recorded frame
        assert_eq!(record["sample"]["detected_volts"], 5.0);
    }
}
