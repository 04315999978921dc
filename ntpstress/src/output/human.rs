use std::sync::Arc;

use ntpstress_core::{RatePlan, RunConfig, RunReport, StepFn, StepUpdate};

mod format;
mod progress;
mod summary;

pub(crate) use format::format_estimate;
use format::{format_duration, format_percent, step_line};
use progress::HumanProgress;
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, cfg: &RunConfig, plan: &RatePlan) {
        println!("server: {}", cfg.server);
        match plan.last_rate() {
            Some(last) => println!(
                "rates: {}..={} step {} ({} steps)",
                cfg.start_rate,
                last,
                cfg.increment,
                plan.len()
            ),
            None => println!(
                "rates: none (max rate {} is below start rate {})",
                cfg.max_rate, cfg.start_rate
            ),
        }
        println!("window: {}", format_duration(cfg.window));
        println!(
            "estimated duration: {}",
            format_estimate(plan.estimated_duration(cfg.window))
        );
        println!();
    }

    fn progress(&self) -> Option<StepFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |u: StepUpdate| {
            let line = step_line(
                u.step.rate.get(),
                u.step.attempted,
                u.step.failed,
                u.step.fail_percent(),
                u.overrun,
            );
            let message = format!(
                "rate={} total_fail={}",
                u.step.rate,
                format_percent(u.totals.fail_percent())
            );
            progress.step(u.index, u.steps_total, &line, message);
        }))
    }

    fn print_summary(&self, _cfg: &RunConfig, report: &RunReport) -> anyhow::Result<()> {
        self.progress.finish();
        println!();
        print!("{}", render(report));
        Ok(())
    }
}
