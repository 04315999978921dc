mod burst;
mod config;
mod counter;
mod error;
mod pacer;
mod plan;
mod progress;
mod ramp;
mod stats;
mod stop;

pub use burst::run_burst;
pub use config::RunConfig;
pub use counter::{BurstCounter, CounterSnapshot};
pub use error::{Error, Result};
pub use pacer::{PaceOutcome, remaining, wait_remaining};
pub use plan::{RatePlan, Rates};
pub use progress::{StepFn, StepUpdate};
pub use ramp::{RampController, RampState};
pub use stats::{RunReport, RunTotals, StepResult};
pub use stop::StopSignal;
