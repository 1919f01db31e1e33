// src/error.rs

use crate::types::Approach;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignalError>;

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("statistics requested over an empty interval log")]
    EmptyLog,

    #[error("sample standard deviation needs at least two intervals, got {count}")]
    InsufficientSample { count: usize },

    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("interval duration must be positive, got {0}s")]
    NonPositiveDuration(f64),

    #[error("interval log for {0} is finalized")]
    LogFinalized(Approach),

    #[error("interval log for {approach} is full ({capacity} intervals)")]
    LogCapacityExceeded { approach: Approach, capacity: usize },

    #[error("gpio {pin}: {source}")]
    Gpio {
        pin: u32,
        #[source]
        source: std::io::Error,
    },
}

impl SignalError {
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        SignalError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
