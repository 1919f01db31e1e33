// src/event_log.rs
//
// Structured run events. Components emit (code, tag, value) triples into
// a sink passed to them; the sink owns formatting and verbosity.

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventCode {
    RunOpened,
    SensorPin,
    RedLampPin,
    GreenLampPin,
    TimeSaved,
    IntervalLength,
    CarsPerSecond,
    SensorReading,
    CarPassed,
    StageEntered,
    StageExited,
    ReportWritten,
    RunTerminated,
    ConfigValue,
    CarsInInterval,
}

impl EventCode {
    /// Stable numeric code written to the log file
    pub fn code(self) -> u8 {
        match self {
            EventCode::RunOpened => 0,
            EventCode::SensorPin => 1,
            EventCode::RedLampPin => 2,
            EventCode::GreenLampPin => 3,
            EventCode::TimeSaved => 4,
            EventCode::IntervalLength => 5,
            EventCode::CarsPerSecond => 6,
            EventCode::SensorReading => 7,
            EventCode::CarPassed => 8,
            EventCode::StageEntered => 9,
            EventCode::StageExited => 10,
            EventCode::ReportWritten => 11,
            EventCode::RunTerminated => 12,
            EventCode::ConfigValue => 13,
            EventCode::CarsInInterval => 14,
        }
    }

    /// The event is written only when the configured degree exceeds this
    pub fn min_degree(self) -> u32 {
        match self {
            EventCode::TimeSaved
            | EventCode::IntervalLength
            | EventCode::CarsPerSecond
            | EventCode::CarsInInterval => 5,
            EventCode::SensorReading | EventCode::CarPassed => 9,
            _ => 0,
        }
    }

    pub fn render(self, tag: &str, value: f64) -> String {
        match self {
            EventCode::RunOpened => "Run log opened.".to_string(),
            EventCode::SensorPin => format!("Sensor {} at pin {}.", tag, value),
            EventCode::RedLampPin => format!("Red lamp {} at pin {}.", tag, value),
            EventCode::GreenLampPin => format!("Green lamp {} at pin {}.", tag, value),
            EventCode::TimeSaved => format!("Time saved: {:.3} s, approach {}.", value, tag),
            EventCode::IntervalLength => {
                format!("Green interval: {:.3} s, approach {}.", value, tag)
            }
            EventCode::CarsPerSecond => {
                format!("Cars per second this interval: {:.4}, approach {}.", value, tag)
            }
            EventCode::SensorReading => format!("Sensor reading: {:.3} m, approach {}.", value, tag),
            EventCode::CarPassed => format!("Car passed, approach {}.", tag),
            EventCode::StageEntered => format!("Entering {}.", tag),
            EventCode::StageExited => format!("Leaving {}.", tag),
            EventCode::ReportWritten => format!("Wrote report file {}.", tag),
            EventCode::RunTerminated => "Run terminated.".to_string(),
            EventCode::ConfigValue => format!("Value of {}: {}", tag, value),
            EventCode::CarsInInterval => format!("Cars this interval: {}, approach {}.", value, tag),
        }
    }
}

pub trait LogSink {
    fn log(&mut self, code: EventCode, tag: &str, value: f64);
}

/// Logging context for one run: verbosity degree plus an optional log file.
/// Built once in `main` and handed to whoever emits events.
pub struct EventLog {
    degree: u32,
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl EventLog {
    /// Appends to `<dir>/<run_label>.log` when `degree` lets anything through
    pub fn open(dir: &Path, run_label: &str, degree: u32) -> std::io::Result<Self> {
        if degree == 0 {
            return Ok(Self::without_file(degree));
        }

        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", run_label));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            degree,
            path: Some(path),
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Mirrors events to tracing only
    pub fn without_file(degree: u32) -> Self {
        Self {
            degree,
            path: None,
            writer: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn enabled(&self, code: EventCode) -> bool {
        self.degree > code.min_degree()
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                warn!("⚠️  Event log flush failed: {}", e);
            }
        }
    }
}

impl LogSink for EventLog {
    fn log(&mut self, code: EventCode, tag: &str, value: f64) {
        let line = code.render(tag, value);
        debug!(code = code.code(), "{}", line);

        if !self.enabled(code) {
            return;
        }
        let failed = match self.writer.as_mut() {
            Some(writer) => writeln!(writer, "[{:02}] {}", code.code(), line).err(),
            None => None,
        };
        if let Some(e) = failed {
            warn!("⚠️  Event log write failed, disabling file output: {}", e);
            self.writer = None;
        }
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub code: EventCode,
    pub tag: String,
    pub value: f64,
}

/// Keeps every event in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Vec<LoggedEvent>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }

    pub fn count(&self, code: EventCode) -> usize {
        self.events.iter().filter(|e| e.code == code).count()
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn log(&mut self, code: EventCode, tag: &str, value: f64) {
        self.events.push(LoggedEvent {
            code,
            tag: tag.to_string(),
            value,
        });
    }
}
