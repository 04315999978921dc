use ntpstress_core::{RatePlan, RunConfig, RunReport, StepFn};

use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) use human::format_estimate;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, cfg: &RunConfig, plan: &RatePlan);
    fn progress(&self) -> Option<StepFn>;
    fn print_summary(&self, cfg: &RunConfig, report: &RunReport) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
