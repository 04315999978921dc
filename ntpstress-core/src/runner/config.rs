use std::sync::Arc;
use std::time::Duration;

use super::error::{Error, Result};
use super::plan::RatePlan;

/// Parameters of one ramp run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub server: Arc<str>,
    pub start_rate: u64,
    pub max_rate: u64,
    pub increment: u64,
    /// Nominal wall-clock length of every rate step.
    pub window: Duration,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(Error::EmptyServer);
        }
        if self.start_rate == 0 {
            return Err(Error::InvalidStartRate);
        }
        if self.increment == 0 {
            return Err(Error::InvalidIncrement);
        }
        if self.window.is_zero() {
            return Err(Error::InvalidWindow);
        }
        Ok(())
    }

    pub fn plan(&self) -> Result<RatePlan> {
        self.validate()?;
        RatePlan::new(self.start_rate, self.max_rate, self.increment)
    }

    /// Steps times window, `None` when it overflows. Overruns are not accounted for.
    pub fn estimated_duration(&self) -> Result<Option<Duration>> {
        Ok(self.plan()?.estimated_duration(self.window))
    }
}
