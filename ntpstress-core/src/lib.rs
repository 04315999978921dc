mod probe;
mod sntp;

pub mod runner;

pub use probe::{FailureKind, Probe, ProbeFuture, ProbeOutcome};
pub use runner::{
    Error, RampController, RampState, RatePlan, Result, RunConfig, RunReport, RunTotals, StepFn,
    StepResult, StepUpdate, StopSignal,
};
pub use sntp::{Error as SntpError, SntpProbe, SntpReply};
