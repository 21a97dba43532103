//! Per-tick telemetry side-channel.
//!
//! Every controller decision is offered to a sink so gain-tuning runs
//! can be analyzed offline. Sinks are best-effort: write failures are
//! logged and swallowed, never surfaced to scheduling.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::params::ControllerParams;

/// One controller decision, as fed to telemetry sinks.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaSample {
    pub app: String,
    /// Working-mode description: "Default" or "Adaptation".
    pub branch: &'static str,
    pub prev_quota: u64,
    pub prev_used: u64,
    pub prev_delta: i64,
    pub error: i64,
    pub cv: i64,
    pub next_quota: u64,
    /// Budget left after this decision.
    pub available_cpu: i64,
}

pub trait TelemetrySink: Send {
    fn record(&mut self, sample: &QuotaSample);
}

/// Discards everything.
#[derive(Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&mut self, _sample: &QuotaSample) {}
}

/// Appends one CSV row per decision.
///
/// The file name carries the gain tuple, so runs with different gains
/// land in different files.
pub struct CsvSink {
    file: File,
}

impl CsvSink {
    pub fn create(dir: impl AsRef<Path>, params: &ControllerParams) -> std::io::Result<Self> {
        let name = format!(
            "quota_trace_{}-{}-{}.csv",
            params.kp, params.ki, params.kd
        );
        let path = dir.as_ref().join(name);
        let fresh = !path.exists();

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if fresh {
            writeln!(
                file,
                "app,branch,prev_quota,prev_used,prev_delta,error,cv,next_quota,available_cpu"
            )?;
        }
        Ok(Self { file })
    }
}

impl TelemetrySink for CsvSink {
    fn record(&mut self, s: &QuotaSample) {
        let row = format!(
            "{},{},{},{},{},{},{},{},{}",
            s.app,
            s.branch,
            s.prev_quota,
            s.prev_used,
            s.prev_delta,
            s.error,
            s.cv,
            s.next_quota,
            s.available_cpu
        );
        if let Err(e) = writeln!(self.file, "{row}") {
            warn!(error = %e, "csv telemetry write failed");
        }
    }
}

/// Appends one JSON object per line.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl TelemetrySink for JsonlSink {
    fn record(&mut self, sample: &QuotaSample) {
        match serde_json::to_string(sample) {
            Ok(line) => {
                if let Err(e) = writeln!(self.file, "{line}") {
                    warn!(error = %e, "jsonl telemetry write failed");
                }
            }
            Err(e) => warn!(error = %e, "telemetry sample serialization failed"),
        }
    }
}
