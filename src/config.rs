use crate::error::SignalError;
use crate::types::{Config, ControllerConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load from a YAML file. `None` when the file does not exist, so the
    /// caller can fall back to defaults once logging is up.
    pub fn load(path: &str) -> Result<Option<Self>> {
        if !Path::new(path).exists() {
            return Ok(None);
        }

        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path))?;
        Ok(Some(config))
    }

    /// Apply the positional command-line overrides (minutes, log degree).
    pub fn apply_overrides(&mut self, minutes: Option<u64>, degree: Option<u32>) {
        if let Some(minutes) = minutes {
            self.controller.run_duration_secs = minutes.saturating_mul(60);
        }
        if let Some(degree) = degree {
            self.logging.degree = degree;
        }
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        let c = &self.controller;

        if c.run_duration_secs == 0 {
            return Err(SignalError::invalid_config(
                "controller.run_duration_secs",
                "must be positive",
            ));
        }
        c.max_phase()?;
        c.idle_timeout()?;
        if c.poll_period_ms == 0 {
            return Err(SignalError::invalid_config(
                "controller.poll_period_ms",
                "must be positive",
            ));
        }
        if c.poll_period() >= c.idle_timeout()? {
            return Err(SignalError::invalid_config(
                "controller.poll_period_ms",
                "must be shorter than the idle timeout",
            ));
        }
        if c.max_intervals_per_approach == Some(0) {
            return Err(SignalError::invalid_config(
                "controller.max_intervals_per_approach",
                "must be at least 1 when set",
            ));
        }

        let s = &self.sensor;
        if !(s.threshold_m > 0.0 && s.threshold_m.is_finite()) {
            return Err(SignalError::invalid_config(
                "sensor.threshold_m",
                format!("must be positive, got {}", s.threshold_m),
            ));
        }
        if s.echo_wait_iterations == 0 || s.max_echo_us == 0 {
            return Err(SignalError::invalid_config(
                "sensor",
                "echo bounds must be positive",
            ));
        }
        let rate_ok = |rate: f64| rate >= 0.0 && rate.is_finite();
        if !rate_ok(s.simulated.north_rate) || !rate_ok(s.simulated.west_rate) {
            return Err(SignalError::invalid_config(
                "sensor.simulated",
                "arrival rates must be finite and non-negative",
            ));
        }

        Ok(())
    }
}

impl ControllerConfig {
    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run_duration_secs)
    }

    pub fn max_phase(&self) -> Result<Duration, SignalError> {
        seconds("controller.max_phase_secs", self.max_phase_secs)
    }

    pub fn idle_timeout(&self) -> Result<Duration, SignalError> {
        seconds("controller.idle_timeout_secs", self.idle_timeout_secs)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    pub fn self_test_step(&self) -> Duration {
        Duration::from_millis(self.self_test_step_ms)
    }
}

/// Positive, finite and representable as a `Duration`
fn seconds(field: &'static str, secs: f64) -> Result<Duration, SignalError> {
    if !(secs > 0.0) {
        return Err(SignalError::invalid_config(
            field,
            format!("must be positive, got {}", secs),
        ));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| SignalError::invalid_config(field, format!("{} s is unusable: {}", secs, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorMode;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.controller.max_phase_secs, 30.0);
        assert_eq!(config.controller.idle_timeout_secs, 10.0);
        assert_eq!(config.controller.poll_period(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let yaml = "controller:\n  run_duration_secs: 60\nsensor:\n  mode: gpio\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.controller.run_duration_secs, 60);
        assert_eq!(config.controller.max_phase_secs, 30.0);
        assert_eq!(config.sensor.mode, SensorMode::Gpio);
        assert_eq!(config.gpio.north.green, 18);
        assert_eq!(config.logging.degree, 0);
    }

    #[test]
    fn test_overrides_convert_minutes() {
        let mut config = Config::default();
        config.apply_overrides(Some(2), Some(10));
        assert_eq!(config.controller.run_duration_secs, 120);
        assert_eq!(config.logging.degree, 10);
    }

    #[test]
    fn test_rejects_non_positive_durations() {
        let mut config = Config::default();
        config.controller.idle_timeout_secs = 0.0;
        assert!(matches!(
            config.validate(),
            Err(SignalError::InvalidConfig {
                field: "controller.idle_timeout_secs",
                ..
            })
        ));

        let mut config = Config::default();
        config.controller.max_phase_secs = -5.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sensor.threshold_m = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_poll_period_longer_than_idle_timeout() {
        let mut config = Config::default();
        config.controller.poll_period_ms = 10_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_reported_not_defaulted() {
        let loaded = Config::load("/nonexistent/signal-controller.yaml").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_loads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "logging:\n  degree: 7\n").unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap().unwrap();
        assert_eq!(config.logging.degree, 7);
    }

    #[test]
    fn test_rejects_infinite_phase_length() {
        let config: Config = serde_yaml::from_str("controller:\n  max_phase_secs: .inf\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(SignalError::InvalidConfig {
                field: "controller.max_phase_secs",
                ..
            })
        ));
        assert!(config.controller.max_phase().is_err());
    }

    #[test]
    fn test_rejects_unrepresentable_idle_timeout() {
        let mut config = Config::default();
        config.controller.idle_timeout_secs = 1e20;
        assert!(matches!(
            config.validate(),
            Err(SignalError::InvalidConfig {
                field: "controller.idle_timeout_secs",
                ..
            })
        ));

        config.controller.idle_timeout_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_sensor_values() {
        let mut config = Config::default();
        config.sensor.threshold_m = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sensor.simulated.west_rate = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_minutes_saturate() {
        let mut config = Config::default();
        config.apply_overrides(Some(u64::MAX), None);
        assert_eq!(config.controller.run_duration_secs, u64::MAX);
    }
}
