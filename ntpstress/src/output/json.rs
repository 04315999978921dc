use serde::Serialize;
use std::io::Write as _;
use std::sync::Arc;

use ntpstress_core::{RatePlan, RunConfig, RunReport, StepFn, StepUpdate};

use super::OutputFormatter;
use crate::report::{ConfigRecord, StepRecord, TotalsRecord};

pub(crate) const NDJSON_SCHEMA: &str = "ntpstress.ndjson.v1";

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _cfg: &RunConfig, _plan: &RatePlan) {}

    fn progress(&self) -> Option<StepFn> {
        Some(Arc::new(move |u: StepUpdate| {
            let line = build_step_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, cfg: &RunConfig, report: &RunReport) -> anyhow::Result<()> {
        let line = build_summary_line(cfg, report);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonStepLine {
    pub kind: &'static str,
    pub schema: &'static str,
    pub index: u64,
    pub steps_total: u64,
    #[serde(flatten)]
    pub step: StepRecord,
    pub overrun_ms: Option<f64>,
    pub run_elapsed_secs: f64,
    pub totals: TotalsRecord,
}

fn build_step_line(u: &StepUpdate) -> JsonStepLine {
    JsonStepLine {
        kind: "step",
        schema: NDJSON_SCHEMA,
        index: u.index,
        steps_total: u.steps_total,
        step: (&u.step).into(),
        overrun_ms: u.overrun.map(|d| d.as_secs_f64() * 1000.0),
        run_elapsed_secs: u.run_elapsed.as_secs_f64(),
        totals: TotalsRecord {
            steps: u.totals.steps,
            attempted: u.totals.attempted,
            failed: u.totals.failed,
            fail_percent: u.totals.fail_percent(),
        },
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub schema: &'static str,
    pub config: ConfigRecord,
    pub totals: TotalsRecord,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

fn build_summary_line(cfg: &RunConfig, report: &RunReport) -> JsonSummaryLine {
    JsonSummaryLine {
        kind: "summary",
        schema: NDJSON_SCHEMA,
        config: cfg.into(),
        totals: report.into(),
        cancelled: report.cancelled,
        elapsed_secs: report.elapsed.as_secs_f64(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
