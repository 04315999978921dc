use std::num::NonZeroU64;
use std::time::Duration;

/// Outcome of one completed rate step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    pub rate: NonZeroU64,
    pub attempted: u64,
    pub failed: u64,
    /// Time from the first dispatch to the burst barrier.
    pub elapsed: Duration,
}

impl StepResult {
    pub fn fail_percent(&self) -> Option<f64> {
        fail_percent(self.failed, self.attempted)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub steps: u64,
    pub attempted: u64,
    pub failed: u64,
}

impl RunTotals {
    pub fn add(&mut self, step: &StepResult) {
        self.steps += 1;
        self.attempted = self.attempted.saturating_add(step.attempted);
        self.failed = self.failed.saturating_add(step.failed);
    }

    pub fn fail_percent(&self) -> Option<f64> {
        fail_percent(self.failed, self.attempted)
    }
}

impl<'a> FromIterator<&'a StepResult> for RunTotals {
    fn from_iter<I: IntoIterator<Item = &'a StepResult>>(iter: I) -> Self {
        let mut totals = Self::default();
        for step in iter {
            totals.add(step);
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// One entry per completed step, ascending by rate.
    pub series: Vec<StepResult>,
    pub totals: RunTotals,
    pub elapsed: Duration,
    /// The run was stopped before the plan was exhausted.
    pub cancelled: bool,
}

impl RunReport {
    /// Overall failed / attempted across all steps. `None` when nothing was attempted.
    pub fn final_fail_percent(&self) -> Option<f64> {
        self.totals.fail_percent()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

fn fail_percent(failed: u64, attempted: u64) -> Option<f64> {
    if attempted == 0 {
        return None;
    }
    Some(failed as f64 / attempted as f64 * 100.0)
}
