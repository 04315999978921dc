use std::sync::Arc;

use tokio::time::Instant;

use super::burst::run_burst;
use super::config::RunConfig;
use super::error::{Error, Result};
use super::pacer::{PaceOutcome, wait_remaining};
use super::plan::RatePlan;
use super::progress::{StepFn, StepUpdate};
use super::stats::{RunReport, RunTotals};
use super::stop::StopSignal;
use crate::probe::Probe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RampState {
    Idle,
    Running,
    Completed,
}

/// Drives one run: a burst per rate step, then pacing out the step window.
///
/// Steps never overlap. A stop request is honored between steps and during
/// pacing; a burst already dispatched always reaches its barrier.
#[derive(Debug)]
pub struct RampController {
    config: RunConfig,
    plan: RatePlan,
    state: RampState,
}

impl RampController {
    pub fn new(config: RunConfig) -> Result<Self> {
        let plan = config.plan()?;
        Ok(Self {
            config,
            plan,
            state: RampState::Idle,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn plan(&self) -> &RatePlan {
        &self.plan
    }

    pub fn state(&self) -> RampState {
        self.state
    }

    pub async fn run(
        &mut self,
        probe: Arc<dyn Probe>,
        stop: &StopSignal,
        on_step: Option<StepFn>,
    ) -> Result<RunReport> {
        if self.state != RampState::Idle {
            return Err(Error::AlreadyStarted);
        }
        self.state = RampState::Running;

        let steps_total = self.plan.len();
        let window = self.config.window;
        tracing::info!(
            server = %self.config.server,
            probe = probe.name(),
            steps = steps_total,
            window_ms = window.as_millis() as u64,
            "ramp started"
        );

        let started = Instant::now();
        let mut series = Vec::with_capacity(usize::try_from(steps_total).unwrap_or(0).min(4096));
        let mut totals = RunTotals::default();
        let mut cancelled = false;

        for (i, rate) in self.plan.rates().enumerate() {
            if stop.is_stopped() {
                cancelled = true;
                break;
            }

            let step = run_burst(rate, self.config.server.clone(), probe.clone()).await;
            series.push(step);
            totals.add(&step);

            let overrun = step.elapsed.checked_sub(window).filter(|d| !d.is_zero());
            if let Some(over) = overrun {
                tracing::warn!(
                    rate = rate.get(),
                    overrun_ms = over.as_millis() as u64,
                    "burst overran its window"
                );
            }

            if let Some(f) = &on_step {
                f(StepUpdate {
                    index: i as u64 + 1,
                    steps_total,
                    step,
                    totals,
                    run_elapsed: started.elapsed(),
                    overrun,
                });
            }

            match wait_remaining(window, step.elapsed, stop).await {
                PaceOutcome::Slept(d) => {
                    tracing::debug!(rate = rate.get(), slept_ms = d.as_millis() as u64, "paced");
                }
                PaceOutcome::Overrun(_) => {}
                PaceOutcome::Interrupted => {
                    cancelled = true;
                    break;
                }
            }
        }

        self.state = RampState::Completed;
        let report = RunReport {
            series,
            totals,
            elapsed: started.elapsed(),
            cancelled,
        };
        tracing::info!(
            steps = report.series.len(),
            attempted = report.totals.attempted,
            failed = report.totals.failed,
            cancelled = report.cancelled,
            "ramp completed"
        );
        Ok(report)
    }
}
