// src/control/mod.rs

pub mod clock;
pub mod controller;
pub mod state_machine;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use controller::{PhaseController, RunOutcome};
