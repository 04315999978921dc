use std::time::Duration;

use super::stats::{RunTotals, StepResult};

#[derive(Debug, Clone)]
pub struct StepUpdate {
    /// 1-based step index.
    pub index: u64,
    pub steps_total: u64,
    pub step: StepResult,
    /// Totals including this step.
    pub totals: RunTotals,
    pub run_elapsed: Duration,
    /// Set when the burst alone took longer than the window.
    pub overrun: Option<Duration>,
}

impl StepUpdate {
    pub fn is_last(&self) -> bool {
        self.index == self.steps_total
    }
}

pub type StepFn = std::sync::Arc<dyn Fn(StepUpdate) + Send + Sync + 'static>;
