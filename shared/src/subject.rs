//! Subject parameter records and their on-disk profile store.
//!
//! Each subject (animal + eye/face view) has a named parameter record
//! holding the sensor ROI applied at startup, the calibration center in
//! pixels, and the analog output gain. Records are stored as JSON files
//! under a profile directory so they survive across sessions. Field names
//! in the serialized form follow the sensor node-map spelling (`Width`,
//! `OffsetX`, ...) for compatibility with the acquisition-side tooling.

use crate::camera::SensorRoi;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-subject acquisition and calibration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectParameters {
    /// Profile name, conventionally `<animal>_<view>` (e.g. `Ada_Eye`)
    #[serde(rename = "Name")]
    pub name: String,
    /// Sensor readout width in pixels
    #[serde(rename = "Width")]
    pub width: u32,
    /// Sensor readout height in pixels
    #[serde(rename = "Height")]
    pub height: u32,
    /// Horizontal readout offset; multiple of 8 when applied to hardware
    #[serde(rename = "OffsetX")]
    pub offset_x: i64,
    /// Vertical readout offset; multiple of 2 when applied to hardware
    #[serde(rename = "OffsetY")]
    pub offset_y: i64,
    /// Calibration center X in pixels
    pub center_x_pix: f64,
    /// Calibration center Y in pixels
    pub center_y_pix: f64,
    /// Analog output gain (volts scale factor, > 0)
    pub voltage_gain: f64,
}

impl SubjectParameters {
    /// Default full-sensor profile with the center at the sensor middle.
    pub fn full_sensor(name: &str, sensor_width: u32, sensor_height: u32) -> Self {
        Self {
            name: name.to_string(),
            width: sensor_width,
            height: sensor_height,
            offset_x: 0,
            offset_y: 0,
            center_x_pix: sensor_width as f64 / 2.0,
            center_y_pix: sensor_height as f64 / 2.0,
            voltage_gain: 1.0,
        }
    }

    /// Calibration center as an (x, y) pixel pair.
    pub fn center(&self) -> (f64, f64) {
        (self.center_x_pix, self.center_y_pix)
    }

    /// The readout ROI described by this record.
    pub fn roi(&self) -> SensorRoi {
        SensorRoi {
            offset_x: self.offset_x,
            offset_y: self.offset_y,
            width: self.width,
            height: self.height,
        }
    }

    /// Split the profile name into (animal, view) on the first underscore.
    /// A name without an underscore is all animal, with "Eye" as the view.
    pub fn animal_and_view(&self) -> (&str, &str) {
        match self.name.split_once('_') {
            Some((animal, view)) if !view.is_empty() => (animal, view),
            _ => (self.name.as_str(), "Eye"),
        }
    }
}

/// On-disk store for subject parameter profiles.
#[derive(Debug, Clone)]
pub struct SubjectStore {
    root_path: PathBuf,
}

impl SubjectStore {
    /// Create a store rooted at the default location (`~/.eyerig`).
    pub fn new() -> std::io::Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
        Ok(Self {
            root_path: PathBuf::from(home).join(".eyerig"),
        })
    }

    /// Create a store rooted at a custom path.
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Root directory of the store.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn parameters_path(&self, name: &str) -> PathBuf {
        let name_safe = name.replace(' ', "_");
        self.root_path.join(format!("Parameters_{name_safe}.json"))
    }

    /// Load a named profile.
    ///
    /// Returns None if no profile exists under this name.
    /// Returns Some(Err) if the file exists but cannot be parsed.
    pub fn load_parameters(&self, name: &str) -> Option<std::io::Result<SubjectParameters>> {
        let path = self.parameters_path(name);

        if !path.exists() {
            return None;
        }

        Some(read_parameters(&path))
    }

    /// Load a named profile, falling back to a full-sensor default.
    pub fn load_or_default(
        &self,
        name: &str,
        sensor_width: u32,
        sensor_height: u32,
    ) -> std::io::Result<SubjectParameters> {
        match self.load_parameters(name) {
            Some(result) => result,
            None => Ok(SubjectParameters::full_sensor(
                name,
                sensor_width,
                sensor_height,
            )),
        }
    }

    /// Save a profile, creating the store directory if needed.
    /// Returns the path the profile was written to.
    pub fn save_parameters(&self, parameters: &SubjectParameters) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.root_path)?;

        let path = self.parameters_path(&parameters.name);
        let json = serde_json::to_string_pretty(parameters)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// List the names of all stored profiles.
    pub fn list_parameters(&self) -> std::io::Result<Vec<String>> {
        if !self.root_path.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root_path)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if let Some(name) = stem.strip_prefix("Parameters_") {
                        names.push(name.to_string());
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// Delete a named profile.
    ///
    /// Returns Ok(true) if the file was deleted, Ok(false) if it didn't exist.
    pub fn delete_parameters(&self, name: &str) -> std::io::Result<bool> {
        let path = self.parameters_path(name);

        if !path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(path)?;
        Ok(true)
    }
}

fn read_parameters(path: &Path) -> std::io::Result<SubjectParameters> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
