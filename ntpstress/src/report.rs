use serde::Serialize;

use ntpstress_core::{RunConfig, RunReport, StepResult};

mod chart;
mod export;

pub(crate) use chart::write_charts;
pub(crate) use export::{ExportFormat, write_export};

pub(crate) const REPORT_SCHEMA: &str = "ntpstress.report.v1";

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ConfigRecord {
    pub server: String,
    pub start_rate: u64,
    pub max_rate: u64,
    pub increment: u64,
    pub window_ms: f64,
}

impl From<&RunConfig> for ConfigRecord {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            server: cfg.server.to_string(),
            start_rate: cfg.start_rate,
            max_rate: cfg.max_rate,
            increment: cfg.increment,
            window_ms: cfg.window.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StepRecord {
    pub rate: u64,
    pub attempted: u64,
    pub failed: u64,
    /// `null` when nothing was attempted.
    pub fail_percent: Option<f64>,
    pub elapsed_ms: f64,
}

impl From<&StepResult> for StepRecord {
    fn from(step: &StepResult) -> Self {
        Self {
            rate: step.rate.get(),
            attempted: step.attempted,
            failed: step.failed,
            fail_percent: step.fail_percent(),
            elapsed_ms: step.elapsed.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TotalsRecord {
    pub steps: u64,
    pub attempted: u64,
    pub failed: u64,
    pub fail_percent: Option<f64>,
}

impl From<&RunReport> for TotalsRecord {
    fn from(report: &RunReport) -> Self {
        Self {
            steps: report.totals.steps,
            attempted: report.totals.attempted,
            failed: report.totals.failed,
            fail_percent: report.final_fail_percent(),
        }
    }
}

/// Whole-run document written by `--export *.json`.
#[derive(Debug, Serialize)]
pub(crate) struct ReportDocument {
    pub schema: &'static str,
    pub config: ConfigRecord,
    pub steps: Vec<StepRecord>,
    pub totals: TotalsRecord,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

impl ReportDocument {
    pub(crate) fn new(cfg: &RunConfig, report: &RunReport) -> Self {
        Self {
            schema: REPORT_SCHEMA,
            config: cfg.into(),
            steps: report.series.iter().map(StepRecord::from).collect(),
            totals: report.into(),
            cancelled: report.cancelled,
            elapsed_secs: report.elapsed.as_secs_f64(),
        }
    }
}
