// src/statistics.rs
//
// Reduction of one approach's interval log into a single summary.
// Every function works on copies of the derived value arrays; the
// caller's chronological log is never reordered.

use crate::error::{Result, SignalError};
use crate::interval::IntervalRecord;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// Aggregate view of one approach over a whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationStatistics {
    pub total_cars: u64,
    pub total_time_secs: f64,
    pub max_cars: u32,
    pub min_cars: u32,
    pub average_cars: f64,
    pub average_time_secs: f64,
    /// Every car count reaching the highest frequency, ascending
    pub mode_cars: Vec<u32>,
    pub max_cps: f64,
    pub min_cps: f64,
    pub average_cps: f64,
    pub median_cps: f64,
    pub population_std_dev_cps: f64,
    pub sample_std_dev_cps: f64,
    pub time_saved_secs: f64,
}

pub struct StatisticsEngine {
    baseline_phase_secs: f64,
}

impl StatisticsEngine {
    /// `baseline_phase_secs` is the fixed phase length the controller is compared against
    pub fn new(baseline_phase_secs: f64) -> Self {
        Self {
            baseline_phase_secs,
        }
    }

    /// One pass over a complete log. Fails as a whole; never returns a partial summary.
    pub fn compute(&self, intervals: &[IntervalRecord]) -> Result<SimulationStatistics> {
        ensure_non_empty(intervals)?;

        let cps = cps_values(intervals);

        let stats = SimulationStatistics {
            total_cars: total_cars(intervals)?,
            total_time_secs: total_time(intervals)?,
            max_cars: max_cars(intervals)?,
            min_cars: min_cars(intervals)?,
            average_cars: average_cars(intervals)?,
            average_time_secs: average_time(intervals)?,
            mode_cars: mode_cars(intervals)?,
            max_cps: max_value(&cps)?,
            min_cps: min_value(&cps)?,
            average_cps: mean(&cps)?,
            median_cps: median(&cps)?,
            population_std_dev_cps: population_std_dev(&cps)?,
            sample_std_dev_cps: sample_std_dev(&cps)?,
            time_saved_secs: time_saved(intervals, self.baseline_phase_secs)?,
        };

        debug!(
            "📊 Reduced {} intervals: {} cars, median {:.3} cps",
            intervals.len(),
            stats.total_cars,
            stats.median_cps
        );

        Ok(stats)
    }
}

fn ensure_non_empty<T>(values: &[T]) -> Result<()> {
    if values.is_empty() {
        Err(SignalError::EmptyLog)
    } else {
        Ok(())
    }
}

fn sort_floats(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

pub fn cps_values(intervals: &[IntervalRecord]) -> Vec<f64> {
    intervals.iter().map(|r| r.cars_per_second()).collect()
}

pub fn total_cars(intervals: &[IntervalRecord]) -> Result<u64> {
    ensure_non_empty(intervals)?;
    Ok(intervals.iter().map(|r| r.car_count() as u64).sum())
}

pub fn total_time(intervals: &[IntervalRecord]) -> Result<f64> {
    ensure_non_empty(intervals)?;
    Ok(intervals.iter().map(|r| r.duration_secs()).sum())
}

pub fn max_cars(intervals: &[IntervalRecord]) -> Result<u32> {
    ensure_non_empty(intervals)?;
    let mut max = intervals[0].car_count();
    for record in &intervals[1..] {
        if record.car_count() > max {
            max = record.car_count();
        }
    }
    Ok(max)
}

pub fn min_cars(intervals: &[IntervalRecord]) -> Result<u32> {
    ensure_non_empty(intervals)?;
    let mut min = intervals[0].car_count();
    for record in &intervals[1..] {
        if record.car_count() < min {
            min = record.car_count();
        }
    }
    Ok(min)
}

pub fn average_cars(intervals: &[IntervalRecord]) -> Result<f64> {
    Ok(total_cars(intervals)? as f64 / intervals.len() as f64)
}

pub fn average_time(intervals: &[IntervalRecord]) -> Result<f64> {
    Ok(total_time(intervals)? / intervals.len() as f64)
}

/// Most frequent car count(s).
///
/// Sorts a copy, then walks runs of equal values once. A strictly longer
/// run replaces the candidates; a run of equal length joins them.
pub fn mode_cars(intervals: &[IntervalRecord]) -> Result<Vec<u32>> {
    ensure_non_empty(intervals)?;

    let mut counts: Vec<u32> = intervals.iter().map(|r| r.car_count()).collect();
    counts.sort_unstable();

    let mut modes = Vec::new();
    let mut best_run = 0usize;
    let mut i = 0;
    while i < counts.len() {
        let value = counts[i];
        let run = counts[i..].iter().take_while(|&&c| c == value).count();

        match run.cmp(&best_run) {
            Ordering::Greater => {
                best_run = run;
                modes.clear();
                modes.push(value);
            }
            Ordering::Equal => modes.push(value),
            Ordering::Less => {}
        }
        i += run;
    }

    Ok(modes)
}

pub fn max_value(values: &[f64]) -> Result<f64> {
    ensure_non_empty(values)?;
    let mut max = values[0];
    for &v in &values[1..] {
        if v > max {
            max = v;
        }
    }
    Ok(max)
}

pub fn min_value(values: &[f64]) -> Result<f64> {
    ensure_non_empty(values)?;
    let mut min = values[0];
    for &v in &values[1..] {
        if v < min {
            min = v;
        }
    }
    Ok(min)
}

pub fn mean(values: &[f64]) -> Result<f64> {
    ensure_non_empty(values)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Result<f64> {
    ensure_non_empty(values)?;

    let mut sorted = values.to_vec();
    sort_floats(&mut sorted);

    let n = sorted.len();
    if n % 2 == 0 {
        Ok((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Ok(sorted[n / 2])
    }
}

fn squared_deviations(values: &[f64]) -> Result<f64> {
    let mu = mean(values)?;
    Ok(values.iter().map(|x| (x - mu).powi(2)).sum())
}

pub fn population_std_dev(values: &[f64]) -> Result<f64> {
    let ss = squared_deviations(values)?;
    Ok((ss / values.len() as f64).sqrt())
}

pub fn sample_std_dev(values: &[f64]) -> Result<f64> {
    ensure_non_empty(values)?;
    if values.len() < 2 {
        return Err(SignalError::InsufficientSample {
            count: values.len(),
        });
    }
    let ss = squared_deviations(values)?;
    Ok((ss / (values.len() - 1) as f64).sqrt())
}

/// Green time avoided compared to running every phase for `baseline_phase_secs`
pub fn time_saved(intervals: &[IntervalRecord], baseline_phase_secs: f64) -> Result<f64> {
    let total = total_time(intervals)?;
    Ok(intervals.len() as f64 * baseline_phase_secs - total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(entries: &[(u32, f64)]) -> Vec<IntervalRecord> {
        entries
            .iter()
            .map(|&(cars, secs)| IntervalRecord::new(cars, secs).unwrap())
            .collect()
    }

    fn counts(cars: &[u32]) -> Vec<IntervalRecord> {
        cars.iter()
            .map(|&c| IntervalRecord::new(c, 30.0).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_log_is_an_error() {
        let engine = StatisticsEngine::new(30.0);
        assert!(matches!(engine.compute(&[]), Err(SignalError::EmptyLog)));
        assert!(matches!(median(&[]), Err(SignalError::EmptyLog)));
        assert!(matches!(mode_cars(&[]), Err(SignalError::EmptyLog)));
    }

    #[test]
    fn test_totals_are_exact_reductions() {
        let log = log_of(&[(3, 30.0), (0, 10.4), (9, 30.0), (2, 12.7)]);
        let stats = StatisticsEngine::new(30.0).compute(&log).unwrap();

        assert_eq!(stats.total_cars, 14);
        let expected_time: f64 = log.iter().map(|r| r.duration_secs()).sum();
        assert_eq!(stats.total_time_secs, expected_time);
        assert_eq!(stats.average_cars, 3.5);
    }

    #[test]
    fn test_bounds_contain_every_interval() {
        let log = log_of(&[(5, 30.0), (1, 11.0), (8, 30.0), (1, 20.0)]);
        let stats = StatisticsEngine::new(30.0).compute(&log).unwrap();

        assert_eq!(stats.max_cars, 8);
        assert_eq!(stats.min_cars, 1);
        for record in &log {
            assert!(stats.min_cars <= record.car_count() && record.car_count() <= stats.max_cars);
            let cps = record.cars_per_second();
            assert!(stats.min_cps <= cps && cps <= stats.max_cps);
        }
    }

    #[test]
    fn test_mode_reports_ties() {
        assert_eq!(mode_cars(&counts(&[2, 2, 3, 5, 5])).unwrap(), vec![2, 5]);
        assert_eq!(mode_cars(&counts(&[5, 2, 3, 2, 5])).unwrap(), vec![2, 5]);
    }

    #[test]
    fn test_mode_single_winner_after_shorter_runs() {
        assert_eq!(mode_cars(&counts(&[1, 4, 4, 4, 2, 2])).unwrap(), vec![4]);
        assert_eq!(mode_cars(&counts(&[7, 7, 7, 1, 1, 1, 1])).unwrap(), vec![1]);
    }

    #[test]
    fn test_mode_all_distinct_returns_every_value() {
        assert_eq!(mode_cars(&counts(&[3, 1, 2])).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_median_does_not_reorder_input() {
        let values = vec![0.9, 0.1, 0.5];
        median(&values).unwrap();
        assert_eq!(values, vec![0.9, 0.1, 0.5]);
    }

    #[test]
    fn test_population_vs_sample_std_dev() {
        let cps = [2.0, 4.0];
        assert_eq!(mean(&cps).unwrap(), 3.0);
        assert_eq!(population_std_dev(&cps).unwrap(), 1.0);
        assert!((sample_std_dev(&cps).unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_single_interval_variance() {
        let cps = [0.4];
        assert!(matches!(
            sample_std_dev(&cps),
            Err(SignalError::InsufficientSample { count: 1 })
        ));
        assert_eq!(population_std_dev(&cps).unwrap(), 0.0);

        let log = log_of(&[(12, 30.0)]);
        assert!(matches!(
            StatisticsEngine::new(30.0).compute(&log),
            Err(SignalError::InsufficientSample { count: 1 })
        ));
    }

    #[test]
    fn test_time_saved_against_baseline() {
        let log = log_of(&[(10, 30.0), (1, 7.0)]);
        assert_eq!(time_saved(&log, 30.0).unwrap(), 23.0);

        let stats = StatisticsEngine::new(30.0).compute(&log).unwrap();
        assert_eq!(stats.time_saved_secs, 23.0);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let log = log_of(&[(4, 30.0), (2, 13.3), (6, 30.0), (2, 10.1), (0, 10.0)]);
        let engine = StatisticsEngine::new(30.0);

        let first = engine.compute(&log).unwrap();
        let second = engine.compute(&log).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.median_cps.to_bits(), second.median_cps.to_bits());
        assert_eq!(
            first.sample_std_dev_cps.to_bits(),
            second.sample_std_dev_cps.to_bits()
        );
        assert_eq!(first.mode_cars, vec![2]);
    }
}
