// src/report.rs

use crate::event_log::{EventCode, LogSink};
use crate::interval::{ApproachLog, IntervalRow};
use crate::statistics::{SimulationStatistics, StatisticsEngine};
use crate::types::Approach;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

const RULE: &str = "x--------x--------x-------x--------x";

/// Everything reported for one approach. The raw intervals are always
/// present, even when the statistics could not be computed.
#[derive(Debug, Clone, Serialize)]
pub struct ApproachReport {
    pub approach: Approach,
    pub intervals: Vec<IntervalRow>,
    pub statistics: Option<SimulationStatistics>,
    pub statistics_error: Option<String>,
}

impl ApproachReport {
    pub fn build(log: &ApproachLog, engine: &StatisticsEngine) -> Self {
        let (statistics, statistics_error) = match engine.compute(log.intervals()) {
            Ok(stats) => (Some(stats), None),
            Err(e) => {
                warn!("⚠️  No statistics for {}: {}", log.approach(), e);
                (None, Some(e.to_string()))
            }
        };

        Self {
            approach: log.approach(),
            intervals: log.rows(),
            statistics,
            statistics_error,
        }
    }

    pub fn render_raw(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Raw Data for {} Direction", self.approach);
        let _ = writeln!(out, "{}\n", RULE);
        for row in &self.intervals {
            let _ = writeln!(out, "Time Interval #{}:", row.index);
            let _ = writeln!(out, "Number of Cars: {}", row.car_count);
            let _ = writeln!(out, "Time Interval Length: {:.6} s", row.duration_secs);
            let _ = writeln!(out, "Cars Per Second: {:.6} cps\n", row.cars_per_second);
        }
        out
    }

    pub fn render_statistics(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Simulation Statistics for {} Direction", self.approach);
        let _ = writeln!(out, "{}\n", RULE);

        let Some(s) = &self.statistics else {
            let reason = self.statistics_error.as_deref().unwrap_or("unknown error");
            let _ = writeln!(out, "Statistics unavailable: {}", reason);
            let _ = writeln!(out, "Intervals recorded: {}", self.intervals.len());
            return out;
        };

        let modes: Vec<String> = s.mode_cars.iter().map(|m| m.to_string()).collect();
        let _ = writeln!(out, "Total Cars: {}", s.total_cars);
        let _ = writeln!(out, "Total Time: {:.6} s", s.total_time_secs);
        let _ = writeln!(out, "Max Cars: {}", s.max_cars);
        let _ = writeln!(out, "Min Cars: {}", s.min_cars);
        let _ = writeln!(out, "Average Cars: {:.6}", s.average_cars);
        let _ = writeln!(out, "Average Time: {:.6} s", s.average_time_secs);
        let _ = writeln!(out, "Mode(s) # of Cars: {}", modes.join(", "));
        let _ = writeln!(out, "Maximum Cars Per Second: {:.6} cps", s.max_cps);
        let _ = writeln!(out, "Minimum Cars Per Second: {:.6} cps", s.min_cps);
        let _ = writeln!(out, "Average Cars Per Second: {:.6} cps", s.average_cps);
        let _ = writeln!(out, "Median Cars Per Second: {:.6} cps", s.median_cps);
        let _ = writeln!(
            out,
            "Population Standard Deviation Cars Per Second: {:.6} cps",
            s.population_std_dev_cps
        );
        let _ = writeln!(
            out,
            "Sample Standard Deviation Cars Per Second: {:.6} cps",
            s.sample_std_dev_cps
        );
        let _ = writeln!(out, "Time Saved: {:.6} s", s.time_saved_secs);
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_label: String,
    pub elapsed_secs: f64,
    pub stop_reason: String,
    pub approaches: Vec<ApproachReport>,
}

pub trait ReportSink {
    /// Persist a finished run; returns what was written
    fn publish(&mut self, report: &RunReport, events: &mut dyn LogSink) -> Result<Vec<PathBuf>>;
}

/// Text files per approach plus an optional JSON summary
pub struct FileReportSink {
    dir: PathBuf,
    write_json: bool,
}

impl FileReportSink {
    pub fn new(dir: impl Into<PathBuf>, write_json: bool) -> Self {
        Self {
            dir: dir.into(),
            write_json,
        }
    }

    fn write(&self, name: String, contents: &str, events: &mut dyn LogSink) -> Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        events.log(EventCode::ReportWritten, &path.display().to_string(), 0.0);
        Ok(path)
    }
}

impl ReportSink for FileReportSink {
    fn publish(&mut self, report: &RunReport, events: &mut dyn LogSink) -> Result<Vec<PathBuf>> {
        events.log(EventCode::StageEntered, "report", 0.0);
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let mut written = Vec::new();
        for approach in &report.approaches {
            let tag = approach.approach.file_tag();
            written.push(self.write(
                format!("{}_{}_RAW.rawstat", report.run_label, tag),
                &approach.render_raw(),
                events,
            )?);
            written.push(self.write(
                format!("{}_{}_SIM.stat", report.run_label, tag),
                &approach.render_statistics(),
                events,
            )?);
        }

        if self.write_json {
            let json = serde_json::to_string_pretty(report)?;
            written.push(self.write(
                format!("{}_summary.json", report.run_label),
                &json,
                events,
            )?);
        }

        info!("📝 Wrote {} report files to {}", written.len(), self.dir.display());
        events.log(EventCode::StageExited, "report", 0.0);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::MemorySink;
    use crate::interval::IntervalRecord;

    fn log_with(approach: Approach, entries: &[(u32, f64)]) -> ApproachLog {
        let mut log = ApproachLog::new(approach);
        for &(cars, secs) in entries {
            log.push(IntervalRecord::new(cars, secs).unwrap()).unwrap();
        }
        log.finalize();
        log
    }

    fn run_report(north: &ApproachLog, west: &ApproachLog) -> RunReport {
        let engine = StatisticsEngine::new(30.0);
        RunReport {
            run_label: "2026-10-17_09:00AM".to_string(),
            elapsed_secs: 60.0,
            stop_reason: "BudgetExhausted".to_string(),
            approaches: vec![
                ApproachReport::build(north, &engine),
                ApproachReport::build(west, &engine),
            ],
        }
    }

    #[test]
    fn test_statistics_failure_keeps_raw_log() {
        let log = log_with(Approach::West, &[(3, 12.0)]);
        let report = ApproachReport::build(&log, &StatisticsEngine::new(30.0));

        assert!(report.statistics.is_none());
        assert!(report.statistics_error.as_deref().unwrap().contains("two intervals"));
        assert_eq!(report.intervals.len(), 1);
        assert!(report.render_statistics().contains("Statistics unavailable"));
        assert!(report.render_raw().contains("Number of Cars: 3"));
    }

    #[test]
    fn test_statistics_text_lists_modes() {
        let log = log_with(
            Approach::North,
            &[(2, 30.0), (2, 30.0), (3, 30.0), (5, 30.0), (5, 12.0)],
        );
        let report = ApproachReport::build(&log, &StatisticsEngine::new(30.0));
        let text = report.render_statistics();

        assert!(text.contains("Mode(s) # of Cars: 2, 5"));
        assert!(text.contains("Total Cars: 17"));
        assert!(text.contains("Time Saved: 18.000000 s"));
    }

    #[test]
    fn test_file_sink_writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let north = log_with(Approach::North, &[(4, 30.0), (1, 10.2)]);
        let west = log_with(Approach::West, &[]);
        let report = run_report(&north, &west);

        let mut sink = FileReportSink::new(dir.path(), true);
        let mut events = MemorySink::new();
        let written = sink.publish(&report, &mut events).unwrap();

        assert_eq!(written.len(), 5);
        for path in &written {
            assert!(path.exists(), "missing {}", path.display());
        }
        assert!(dir
            .path()
            .join("2026-10-17_09:00AM_NORTH_SIM.stat")
            .exists());
        assert_eq!(events.count(EventCode::ReportWritten), 5);

        let json = fs::read_to_string(dir.path().join("2026-10-17_09:00AM_summary.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["approaches"][0]["statistics"]["total_cars"], 5);
        assert!(value["approaches"][1]["statistics"].is_null());
    }
}
