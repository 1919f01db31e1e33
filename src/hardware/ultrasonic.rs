// src/hardware/ultrasonic.rs
//
// Trigger/echo ranging sensor (HC-SR04 style), one per approach.

use super::gpio::GpioPin;
use super::ProximityDetector;
use crate::error::Result;
use crate::types::{Approach, Detection, SensorConfig};
use std::time::Duration;
use tracing::{debug, warn};

const TRIGGER_PULSE: Duration = Duration::from_micros(15);
const ECHO_STEP_US: u32 = 10;
/// Round-trip echo microseconds per metre of range
const ECHO_US_PER_METRE: f64 = 5800.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Echo measured; range in metres
    Range(f64),
    /// Echo stayed high past the maximum: nothing in range
    OutOfRange,
    /// Echo never rose
    NoEcho,
}

pub struct SensorPins<P> {
    pub trigger: P,
    pub echo: P,
}

pub struct UltrasonicDetector<P: GpioPin> {
    north: SensorPins<P>,
    west: SensorPins<P>,
    threshold_m: f64,
    echo_wait_iterations: u32,
    max_echo_us: u32,
    poll_step: Duration,
    last_range: Option<f64>,
}

impl<P: GpioPin> UltrasonicDetector<P> {
    pub fn new(north: SensorPins<P>, west: SensorPins<P>, config: &SensorConfig) -> Self {
        Self {
            north,
            west,
            threshold_m: config.threshold_m,
            echo_wait_iterations: config.echo_wait_iterations,
            max_echo_us: config.max_echo_us,
            poll_step: Duration::from_micros(1),
            last_range: None,
        }
    }

    /// Sleep between echo polls; zero turns the waits into pure iteration counts
    #[cfg(test)]
    pub fn with_poll_step(mut self, step: Duration) -> Self {
        self.poll_step = step;
        self
    }

    pub fn read(&mut self, approach: Approach) -> Result<Reading> {
        let step = self.poll_step;
        let wait_iterations = self.echo_wait_iterations;
        let max_echo_us = self.max_echo_us;
        let pins = match approach {
            Approach::North => &mut self.north,
            Approach::West => &mut self.west,
        };

        pins.trigger.set(true)?;
        std::thread::sleep(TRIGGER_PULSE);
        pins.trigger.set(false)?;

        let mut iterations = 0;
        while !pins.echo.is_high()? {
            if iterations >= wait_iterations {
                return Ok(Reading::NoEcho);
            }
            std::thread::sleep(step);
            iterations += 1;
        }

        let mut echo_us = 0u32;
        while pins.echo.is_high()? {
            if echo_us >= max_echo_us {
                return Ok(Reading::OutOfRange);
            }
            std::thread::sleep(step * ECHO_STEP_US);
            echo_us += ECHO_STEP_US;
        }

        Ok(Reading::Range(echo_us as f64 / ECHO_US_PER_METRE))
    }
}

impl<P: GpioPin> ProximityDetector for UltrasonicDetector<P> {
    fn detect(&mut self, approach: Approach) -> Detection {
        let reading = match self.read(approach) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("⚠️  {} sensor read failed: {}", approach, e);
                self.last_range = None;
                return Detection::TimedOut;
            }
        };

        match reading {
            Reading::Range(range) => {
                self.last_range = Some(range);
                if range <= self.threshold_m {
                    debug!("{} sensor: object at {:.2} m", approach, range);
                    Detection::Passed
                } else {
                    Detection::NotPassed
                }
            }
            Reading::OutOfRange => {
                self.last_range = None;
                Detection::NotPassed
            }
            Reading::NoEcho => {
                self.last_range = None;
                Detection::TimedOut
            }
        }
    }

    fn last_reading(&self) -> Option<f64> {
        self.last_range
    }
}
