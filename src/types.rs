// src/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerConfig,
    pub sensor: SensorConfig,
    pub gpio: GpioConfig,
    pub logging: LoggingConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Wall-clock budget for the whole run, checked only between phases
    pub run_duration_secs: u64,
    /// Longest a phase may stay green; also the baseline for time saved
    pub max_phase_secs: f64,
    /// Inactivity after which a phase is cut short
    pub idle_timeout_secs: f64,
    pub poll_period_ms: u64,
    /// Pause after each lamp change during the startup self-test
    pub self_test_step_ms: u64,
    pub max_intervals_per_approach: Option<usize>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            run_duration_secs: 300,
            max_phase_secs: 30.0,
            idle_timeout_secs: 10.0,
            poll_period_ms: 100,
            self_test_step_ms: 1000,
            max_intervals_per_approach: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    Simulated,
    Gpio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub mode: SensorMode,
    /// Anything closer than this (metres) counts as a passing car
    pub threshold_m: f64,
    pub echo_wait_iterations: u32,
    pub max_echo_us: u32,
    pub simulated: SimulatedTrafficConfig,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            mode: SensorMode::Simulated,
            threshold_m: 0.3,
            echo_wait_iterations: 5000,
            max_echo_us: 32000,
            simulated: SimulatedTrafficConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedTrafficConfig {
    /// Mean arrivals per second
    pub north_rate: f64,
    pub west_rate: f64,
    pub seed: u64,
}

impl Default for SimulatedTrafficConfig {
    fn default() -> Self {
        Self {
            north_rate: 0.35,
            west_rate: 0.2,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub sysfs_root: String,
    pub north: ApproachPins,
    pub west: ApproachPins,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            sysfs_root: "/sys/class/gpio".to_string(),
            north: ApproachPins {
                green: 18,
                red: 46,
                trigger: 19,
                echo: 2,
            },
            west: ApproachPins {
                green: 3,
                red: 1,
                trigger: 11,
                echo: 0,
            },
        }
    }
}

impl GpioConfig {
    pub fn pins(&self, approach: Approach) -> ApproachPins {
        match approach {
            Approach::North => self.north,
            Approach::West => self.west,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ApproachPins {
    pub green: u32,
    pub red: u32,
    pub trigger: u32,
    pub echo: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing filter directive
    pub level: String,
    /// Verbosity threshold for the event log file (0 writes nothing)
    pub degree: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            degree: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: String,
    pub write_json: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
            write_json: true,
        }
    }
}

/// One of the two controlled traffic directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Approach {
    North,
    West,
}

impl Approach {
    pub const ALL: [Approach; 2] = [Approach::North, Approach::West];

    pub fn opposite(self) -> Self {
        match self {
            Approach::North => Approach::West,
            Approach::West => Approach::North,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Approach::North => "North",
            Approach::West => "West",
        }
    }

    /// Upper-case form used in report file names
    pub fn file_tag(self) -> &'static str {
        match self {
            Approach::North => "NORTH",
            Approach::West => "WEST",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LampColor {
    Green,
    Red,
}

/// Outcome of a single proximity detection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Passed,
    NotPassed,
    /// The sensor never answered; treated exactly like `NotPassed`
    TimedOut,
}

impl Detection {
    pub fn is_passage(self) -> bool {
        matches!(self, Detection::Passed)
    }
}
