#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// The final fail percentage exceeded `--fail-threshold`.
    FailThresholdExceeded = 11,

    /// Invalid CLI/config values (bad flags, zero rates, unreadable durations, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors writing charts or exports, signal setup).
    RuntimeError = 40,

    /// The run was stopped with Ctrl-C before the plan was exhausted.
    Interrupted = 130,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Exit status for a finished run. Interruption wins over the threshold check.
    #[must_use]
    pub fn from_run(cancelled: bool, fail_percent: Option<f64>, threshold: Option<f64>) -> Self {
        if cancelled {
            return Self::Interrupted;
        }
        match (fail_percent, threshold) {
            (Some(observed), Some(limit)) if observed > limit => Self::FailThresholdExceeded,
            _ => Self::Success,
        }
    }
}
