//! Analog-output and counter-input abstractions for the acquisition DAQ.
//!
//! The rig drives two analog-output channel pairs (pupil X/Y, and an
//! optional area/detected pair) and reads an edge-counting input wired to
//! the scope's frame trigger line. The vendor driver lives behind these
//! traits so the lifecycle can be exercised against in-memory doubles.

use thiserror::Error;

/// Errors produced by DAQ operations.
#[derive(Error, Debug)]
pub enum DaqError {
    /// The named output channel is not present on this rig.
    #[error("analog output channel {channel} unavailable: {reason}")]
    ChannelUnavailable { channel: String, reason: String },

    /// A write to an available channel failed.
    #[error("write to {channel} failed: {reason}")]
    WriteFailed { channel: String, reason: String },

    /// Reading the scope frame counter failed.
    #[error("counter read failed: {0}")]
    CounterRead(String),
}

/// Analog voltage output toward the external acquisition hardware.
///
/// The position pair is the primary output and must be present; the aux
/// pair (pupil area + detected flag) is an optional secondary device and
/// callers are expected to degrade gracefully when it is missing.
pub trait AnalogOutput: Send {
    /// Write the pupil position sample to the primary X/Y channel pair.
    fn write_position(&mut self, x_volts: f64, y_volts: f64) -> Result<(), DaqError>;

    /// Write the pupil area and detected flag to the aux channel pair.
    fn write_aux(&mut self, area_volts: f64, detected_volts: f64) -> Result<(), DaqError>;
}

/// Edge-counting input wired to the scope's frame trigger.
///
/// The counter is monotonically non-decreasing for the duration of an
/// acquisition; a regression indicates the counter task was restarted.
pub trait ScopeCounterInput: Send {
    /// Read the current edge count.
    fn read(&mut self) -> Result<u32, DaqError>;
}

/// In-memory analog output double that records every write.
#[derive(Debug, Default)]
pub struct MemoryDaq {
    positions: Vec<(f64, f64)>,
    aux: Vec<(f64, f64)>,
    aux_available: bool,
}

impl MemoryDaq {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            aux: Vec::new(),
            aux_available: true,
        }
    }

    /// A rig with no aux device connected.
    pub fn without_aux() -> Self {
        Self {
            aux_available: false,
            ..Self::new()
        }
    }

    pub fn positions(&self) -> &[(f64, f64)] {
        &self.positions
    }

    pub fn aux(&self) -> &[(f64, f64)] {
        &self.aux
    }
}

impl AnalogOutput for MemoryDaq {
    fn write_position(&mut self, x_volts: f64, y_volts: f64) -> Result<(), DaqError> {
        self.positions.push((x_volts, y_volts));
        Ok(())
    }

    fn write_aux(&mut self, area_volts: f64, detected_volts: f64) -> Result<(), DaqError> {
        if !self.aux_available {
            return Err(DaqError::ChannelUnavailable {
                channel: "aux".into(),
                reason: "device not connected".into(),
            });
        }
        self.aux.push((area_volts, detected_volts));
        Ok(())
    }
}

/// Analog output double that discards all writes.
#[derive(Debug, Default)]
pub struct NullDaq;

impl AnalogOutput for NullDaq {
    fn write_position(&mut self, _x_volts: f64, _y_volts: f64) -> Result<(), DaqError> {
        Ok(())
    }

    fn write_aux(&mut self, _area_volts: f64, _detected_volts: f64) -> Result<(), DaqError> {
        Ok(())
    }
}

/// Counter double that plays back a fixed sequence of readings, repeating
/// the final value once the script is exhausted.
#[derive(Debug)]
pub struct ScriptedCounter {
    values: Vec<u32>,
    index: usize,
}

impl ScriptedCounter {
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, index: 0 }
    }
}

impl ScopeCounterInput for ScriptedCounter {
    fn read(&mut self) -> Result<u32, DaqError> {
        let value = self
            .values
            .get(self.index)
            .or_else(|| self.values.last())
            .copied()
            .ok_or_else(|| DaqError::CounterRead("empty counter script".into()))?;
        self.index += 1;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_daq_records_writes() {
        let mut daq = MemoryDaq::new();
        daq.write_position(1.0, -2.0).unwrap();
        daq.write_aux(0.5, 5.0).unwrap();
        assert_eq!(daq.positions(), &[(1.0, -2.0)]);
        assert_eq!(daq.aux(), &[(0.5, 5.0)]);
    }

    #[test]
    fn test_missing_aux_device() {
        let mut daq = MemoryDaq::without_aux();
        daq.write_position(0.0, 0.0).unwrap();
        assert!(matches!(
            daq.write_aux(0.0, 5.0),
            Err(DaqError::ChannelUnavailable { .. })
        ));
    }

    #[test]
    fn test_scripted_counter_repeats_last() {
        let mut counter = ScriptedCounter::new(vec![0, 1, 2]);
        assert_eq!(counter.read().unwrap(), 0);
        assert_eq!(counter.read().unwrap(), 1);
        assert_eq!(counter.read().unwrap(), 2);
        assert_eq!(counter.read().unwrap(), 2);
    }

    #[test]
    fn test_empty_counter_script_errors() {
        let mut counter = ScriptedCounter::new(vec![]);
        assert!(counter.read().is_err());
    }
}
