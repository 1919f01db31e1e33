// src/interval.rs

use crate::error::{Result, SignalError};
use crate::types::Approach;
use serde::Serialize;

/// Outcome of one completed green phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalRecord {
    car_count: u32,
    duration_secs: f64,
}

impl IntervalRecord {
    pub fn new(car_count: u32, duration_secs: f64) -> Result<Self> {
        if !(duration_secs > 0.0) || !duration_secs.is_finite() {
            return Err(SignalError::NonPositiveDuration(duration_secs));
        }
        Ok(Self {
            car_count,
            duration_secs,
        })
    }

    pub fn car_count(&self) -> u32 {
        self.car_count
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Always derived from the two stored inputs
    pub fn cars_per_second(&self) -> f64 {
        self.car_count as f64 / self.duration_secs
    }

    pub fn row(&self, index: usize) -> IntervalRow {
        IntervalRow {
            index,
            car_count: self.car_count,
            duration_secs: self.duration_secs,
            cars_per_second: self.cars_per_second(),
        }
    }
}

/// Flat, serializable view of a record for reports
#[derive(Debug, Clone, Serialize)]
pub struct IntervalRow {
    pub index: usize,
    pub car_count: u32,
    pub duration_secs: f64,
    pub cars_per_second: f64,
}

/// Accumulates cars during an active phase
#[derive(Debug, Default)]
pub struct IntervalRecorder {
    car_count: u32,
}

impl IntervalRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_car(&mut self) -> u32 {
        self.car_count = self.car_count.saturating_add(1);
        self.car_count
    }

    pub fn close(self, duration_secs: f64) -> Result<IntervalRecord> {
        IntervalRecord::new(self.car_count, duration_secs)
    }
}

/// Chronological intervals for one approach
#[derive(Debug, Clone)]
pub struct ApproachLog {
    approach: Approach,
    intervals: Vec<IntervalRecord>,
    capacity: Option<usize>,
    finalized: bool,
}

impl ApproachLog {
    pub fn new(approach: Approach) -> Self {
        Self {
            approach,
            intervals: Vec::new(),
            capacity: None,
            finalized: false,
        }
    }

    pub fn with_capacity_limit(approach: Approach, capacity: usize) -> Self {
        Self {
            approach,
            intervals: Vec::with_capacity(capacity.min(1024)),
            capacity: Some(capacity),
            finalized: false,
        }
    }

    pub fn approach(&self) -> Approach {
        self.approach
    }

    pub fn push(&mut self, record: IntervalRecord) -> Result<()> {
        if self.finalized {
            return Err(SignalError::LogFinalized(self.approach));
        }
        if let Some(capacity) = self.capacity {
            if self.intervals.len() >= capacity {
                return Err(SignalError::LogCapacityExceeded {
                    approach: self.approach,
                    capacity,
                });
            }
        }
        self.intervals.push(record);
        Ok(())
    }

    /// True once no further interval can be appended
    pub fn is_full(&self) -> bool {
        self.capacity
            .map_or(false, |capacity| self.intervals.len() >= capacity)
    }

    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    #[cfg(test)]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn intervals(&self) -> &[IntervalRecord] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn rows(&self) -> Vec<IntervalRow> {
        self.intervals
            .iter()
            .enumerate()
            .map(|(i, record)| record.row(i + 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cars_per_second_is_derived() {
        let record = IntervalRecord::new(6, 12.0).unwrap();
        assert_eq!(record.cars_per_second(), 0.5);

        let empty = IntervalRecord::new(0, 10.5).unwrap();
        assert_eq!(empty.cars_per_second(), 0.0);
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        assert!(matches!(
            IntervalRecord::new(3, 0.0),
            Err(SignalError::NonPositiveDuration(_))
        ));
        assert!(IntervalRecord::new(3, -1.0).is_err());
        assert!(IntervalRecord::new(3, f64::NAN).is_err());
    }

    #[test]
    fn test_recorder_counts_cars() {
        let mut recorder = IntervalRecorder::new();
        recorder.record_car();
        recorder.record_car();
        assert_eq!(recorder.record_car(), 3);

        let record = recorder.close(30.0).unwrap();
        assert_eq!(record.car_count(), 3);
        assert_eq!(record.duration_secs(), 30.0);
    }

    #[test]
    fn test_log_preserves_order() {
        let mut log = ApproachLog::new(Approach::North);
        for cars in [4, 1, 7] {
            log.push(IntervalRecord::new(cars, 30.0).unwrap()).unwrap();
        }

        let counts: Vec<u32> = log.intervals().iter().map(|r| r.car_count()).collect();
        assert_eq!(counts, vec![4, 1, 7]);

        let rows = log.rows();
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[2].car_count, 7);
    }

    #[test]
    fn test_finalized_log_rejects_push() {
        let mut log = ApproachLog::new(Approach::West);
        log.push(IntervalRecord::new(1, 5.0).unwrap()).unwrap();
        log.finalize();

        assert!(matches!(
            log.push(IntervalRecord::new(1, 5.0).unwrap()),
            Err(SignalError::LogFinalized(Approach::West))
        ));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_capacity_limit_is_enforced() {
        let mut log = ApproachLog::with_capacity_limit(Approach::North, 2);
        log.push(IntervalRecord::new(1, 5.0).unwrap()).unwrap();
        assert!(!log.is_full());
        log.push(IntervalRecord::new(2, 5.0).unwrap()).unwrap();
        assert!(log.is_full());

        assert!(matches!(
            log.push(IntervalRecord::new(3, 5.0).unwrap()),
            Err(SignalError::LogCapacityExceeded { capacity: 2, .. })
        ));
    }
}
