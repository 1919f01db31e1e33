// src/control/state_machine.rs
//
// Two-phase extend/cut decision core. Pure: time and detections are
// passed in, nothing here sleeps or touches hardware.

use crate::error::{Result, SignalError};
use crate::interval::{IntervalRecord, IntervalRecorder};
use crate::types::{Approach, ControllerConfig, Detection};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseState {
    GreenNorth,
    GreenWest,
}

impl PhaseState {
    /// Approach holding right-of-way
    pub fn green(self) -> Approach {
        match self {
            PhaseState::GreenNorth => Approach::North,
            PhaseState::GreenWest => Approach::West,
        }
    }

    pub fn red(self) -> Approach {
        self.green().opposite()
    }

    pub fn next(self) -> Self {
        match self {
            PhaseState::GreenNorth => PhaseState::GreenWest,
            PhaseState::GreenWest => PhaseState::GreenNorth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseLimits {
    max_phase: Duration,
    idle_timeout: Duration,
}

impl PhaseLimits {
    pub fn new(max_phase: Duration, idle_timeout: Duration) -> Result<Self> {
        if max_phase.is_zero() {
            return Err(SignalError::invalid_config("max_phase", "must be positive"));
        }
        if idle_timeout.is_zero() {
            return Err(SignalError::invalid_config(
                "idle_timeout",
                "must be positive",
            ));
        }
        Ok(Self {
            max_phase,
            idle_timeout,
        })
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self> {
        Self::new(config.max_phase()?, config.idle_timeout()?)
    }

    pub fn max_phase(&self) -> Duration {
        self.max_phase
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}

/// Why a phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseEnd {
    /// Ran the whole max phase length
    FullDuration,
    /// Cut short after the idle timeout
    IdleCutoff,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedInterval {
    pub approach: Approach,
    pub record: IntervalRecord,
    pub end: PhaseEnd,
    /// Green time avoided versus the max phase length; zero for full intervals
    pub saved_secs: f64,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: PhaseState,
    /// Running car count when this tick saw a passage
    pub car_passed: Option<u32>,
    pub closed: Option<ClosedInterval>,
}

impl Transition {
    fn hold(state: PhaseState, car_passed: Option<u32>) -> Self {
        Self {
            next: state,
            car_passed,
            closed: None,
        }
    }
}

#[derive(Debug)]
struct ActivePhase {
    started_at: Duration,
    last_activity: Duration,
    recorder: IntervalRecorder,
}

pub struct PhaseMachine {
    state: PhaseState,
    limits: PhaseLimits,
    active: Option<ActivePhase>,
}

impl PhaseMachine {
    /// Starts in `GreenNorth` with no phase running
    pub fn new(limits: PhaseLimits) -> Self {
        Self {
            state: PhaseState::GreenNorth,
            limits,
            active: None,
        }
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn limits(&self) -> &PhaseLimits {
        &self.limits
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Enter the current state: both clocks and the car counter restart at `now`.
    pub fn begin(&mut self, now: Duration) -> PhaseState {
        self.active = Some(ActivePhase {
            started_at: now,
            last_activity: now,
            recorder: IntervalRecorder::new(),
        });
        self.state
    }

    /// Feed one detection taken at `now`.
    ///
    /// The full-duration check runs before the idle check, so a phase that
    /// hits both on the same tick is recorded as full.
    pub fn tick(&mut self, now: Duration, detection: Detection) -> Result<Transition> {
        let Some(phase) = self.active.as_mut() else {
            return Ok(Transition::hold(self.state, None));
        };

        let mut car_passed = None;
        if detection.is_passage() {
            car_passed = Some(phase.recorder.record_car());
            phase.last_activity = now;
        }

        let phase_clock = now.saturating_sub(phase.started_at);
        let idle_clock = now.saturating_sub(phase.last_activity);

        let (end, duration) = if phase_clock >= self.limits.max_phase {
            (PhaseEnd::FullDuration, self.limits.max_phase)
        } else if idle_clock >= self.limits.idle_timeout {
            (PhaseEnd::IdleCutoff, phase_clock)
        } else {
            return Ok(Transition::hold(self.state, car_passed));
        };

        let approach = self.state.green();
        let recorder = match self.active.take() {
            Some(phase) => phase.recorder,
            None => IntervalRecorder::new(),
        };
        let record = recorder.close(duration.as_secs_f64())?;
        let saved_secs = match end {
            PhaseEnd::FullDuration => 0.0,
            PhaseEnd::IdleCutoff => (self.limits.max_phase - duration).as_secs_f64(),
        };

        self.state = self.state.next();

        Ok(Transition {
            next: self.state,
            car_passed,
            closed: Some(ClosedInterval {
                approach,
                record,
                end,
                saved_secs,
            }),
        })
    }
}
