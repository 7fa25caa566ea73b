//! Shared components and utilities for the eye-tracking rig crates.
//!
//! This crate contains the common types, hardware abstractions, and
//! utilities used by both the lifecycle engine and the rig binaries.

pub mod camera;
pub mod daq;
pub mod detector;
pub mod frame_stamp;
pub mod frame_writer;
pub mod subject;
pub mod telemetry;
