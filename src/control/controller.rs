// src/control/controller.rs
//
// Drives the phase machine against real (or injected) time, sensors and
// lamps. One controller owns both approach logs for the whole run.

use super::clock::Clock;
use super::state_machine::{ClosedInterval, PhaseEnd, PhaseLimits, PhaseMachine, PhaseState};
use crate::error::Result;
use crate::event_log::{EventCode, LogSink};
use crate::hardware::{Indicators, ProximityDetector};
use crate::interval::ApproachLog;
use crate::types::{Approach, ControllerConfig, LampColor};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Lamp order of the startup self-test
const SELF_TEST_SEQUENCE: [(Approach, LampColor); 4] = [
    (Approach::West, LampColor::Green),
    (Approach::West, LampColor::Red),
    (Approach::North, LampColor::Green),
    (Approach::North, LampColor::Red),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BudgetExhausted,
    LogFull(Approach),
    /// An interval could not be recorded; the run ended early
    Fault,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::BudgetExhausted => f.write_str("run budget exhausted"),
            StopReason::LogFull(approach) => write!(f, "{} interval log full", approach),
            StopReason::Fault => f.write_str("interval could not be recorded"),
        }
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub north: ApproachLog,
    pub west: ApproachLog,
    pub phases: usize,
    pub elapsed: Duration,
    pub stop: StopReason,
}

impl RunOutcome {
    pub fn log(&self, approach: Approach) -> &ApproachLog {
        match approach {
            Approach::North => &self.north,
            Approach::West => &self.west,
        }
    }
}

pub struct PhaseController<C: Clock, D: ProximityDetector, I: Indicators> {
    run_duration: Duration,
    poll_period: Duration,
    self_test_step: Duration,
    interval_cap: Option<usize>,
    machine: PhaseMachine,
    clock: C,
    detector: D,
    indicators: I,
}

impl<C: Clock, D: ProximityDetector, I: Indicators> PhaseController<C, D, I> {
    pub fn new(config: &ControllerConfig, clock: C, detector: D, indicators: I) -> Result<Self> {
        let limits = PhaseLimits::from_config(config)?;
        Ok(Self {
            run_duration: config.run_duration(),
            poll_period: config.poll_period(),
            self_test_step: config.self_test_step(),
            interval_cap: config.max_intervals_per_approach,
            machine: PhaseMachine::new(limits),
            clock,
            detector,
            indicators,
        })
    }

    #[cfg(test)]
    pub fn indicators(&self) -> &I {
        &self.indicators
    }

    /// Flash every lamp once so a technician can see the wiring is right
    pub fn self_test(&mut self) {
        info!("🔦 Lamp self-test");
        for (approach, color) in SELF_TEST_SEQUENCE {
            self.indicators.set_indicator(approach, color, true);
            self.clock.sleep(self.self_test_step);
            self.indicators.set_indicator(approach, color, false);
            self.clock.sleep(self.self_test_step);
        }
    }

    /// Self-test, then alternate phases until the run budget is spent.
    ///
    /// The budget is checked only between phases; a running phase always
    /// finishes. Both lamps are dark and both logs finalized on return.
    pub fn run(&mut self, events: &mut dyn LogSink) -> RunOutcome {
        self.self_test();

        let mut north = self.new_log(Approach::North);
        let mut west = self.new_log(Approach::West);
        let mut phases = 0;
        let started = self.clock.now();

        info!(
            "🚦 Controller running for {:?} (max phase {:?}, idle cutoff {:?})",
            self.run_duration,
            self.machine.limits().max_phase(),
            self.machine.limits().idle_timeout()
        );

        let stop = loop {
            if self.clock.now().saturating_sub(started) >= self.run_duration {
                break StopReason::BudgetExhausted;
            }

            let approach = self.machine.state().green();
            let log = match approach {
                Approach::North => &mut north,
                Approach::West => &mut west,
            };
            if log.is_full() {
                warn!("⚠️  {} log reached its interval cap, stopping", approach);
                break StopReason::LogFull(approach);
            }

            let closed = match self.run_phase(events) {
                Ok(closed) => closed,
                Err(e) => {
                    error!("❌ Phase for {} could not close: {}", approach, e);
                    break StopReason::Fault;
                }
            };
            if let Err(e) = log.push(closed.record) {
                error!("❌ Could not record {} interval: {}", approach, e);
                break StopReason::Fault;
            }
            phases += 1;
        };

        self.indicators.all_off();
        north.finalize();
        west.finalize();

        let elapsed = self.clock.now().saturating_sub(started);
        info!(
            "🏁 Run finished after {:.1}s: {} phases ({} north, {} west), {}",
            elapsed.as_secs_f64(),
            phases,
            north.len(),
            west.len(),
            stop
        );

        RunOutcome {
            north,
            west,
            phases,
            elapsed,
            stop,
        }
    }

    fn new_log(&self, approach: Approach) -> ApproachLog {
        match self.interval_cap {
            Some(cap) => ApproachLog::with_capacity_limit(approach, cap),
            None => ApproachLog::new(approach),
        }
    }

    fn show_phase(&mut self, state: PhaseState) {
        let green = state.green();
        let red = state.red();
        self.indicators.set_indicator(green, LampColor::Green, true);
        self.indicators.set_indicator(green, LampColor::Red, false);
        self.indicators.set_indicator(red, LampColor::Red, true);
        self.indicators.set_indicator(red, LampColor::Green, false);
    }

    /// Poll until the machine closes the current phase
    fn run_phase(&mut self, events: &mut dyn LogSink) -> Result<ClosedInterval> {
        let state = self.machine.begin(self.clock.now());
        self.show_phase(state);
        let approach = state.green();
        debug!("🟢 {} green", approach);

        loop {
            let detection = self.detector.detect(approach);
            if let Some(range) = self.detector.last_reading() {
                events.log(EventCode::SensorReading, approach.name(), range);
            }

            let transition = self.machine.tick(self.clock.now(), detection)?;

            if let Some(count) = transition.car_passed {
                debug!("🚗 {} car #{}", approach, count);
                events.log(EventCode::CarPassed, approach.name(), count as f64);
            }

            if let Some(closed) = transition.closed {
                self.report_interval(&closed, events);
                debug!("🔁 {} green next", transition.next.green());
                self.clock.sleep(self.poll_period);
                return Ok(closed);
            }

            self.clock.sleep(self.poll_period);
        }
    }

    fn report_interval(&self, closed: &ClosedInterval, events: &mut dyn LogSink) {
        let tag = closed.approach.name();
        let record = &closed.record;

        events.log(EventCode::TimeSaved, tag, closed.saved_secs);
        events.log(EventCode::IntervalLength, tag, record.duration_secs());
        events.log(EventCode::CarsInInterval, tag, record.car_count() as f64);
        events.log(EventCode::CarsPerSecond, tag, record.cars_per_second());

        match closed.end {
            PhaseEnd::FullDuration => info!(
                "✅ {} full phase: {} cars in {:.1}s ({:.3} cps)",
                tag,
                record.car_count(),
                record.duration_secs(),
                record.cars_per_second()
            ),
            PhaseEnd::IdleCutoff => info!(
                "✂️  {} cut after {:.1}s idle: {} cars in {:.1}s, saved {:.1}s",
                tag,
                self.machine.limits().idle_timeout().as_secs_f64(),
                record.car_count(),
                record.duration_secs(),
                closed.saved_secs
            ),
        }
    }
}
