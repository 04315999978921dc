use std::time::Duration;

use super::stop::StopSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceOutcome {
    /// Slept out the rest of the window.
    Slept(Duration),
    /// The burst took the whole window or longer; no sleep.
    Overrun(Duration),
    /// Stop was requested while waiting.
    Interrupted,
}

/// Time left in `window` after `elapsed` has been spent. Zero on overrun.
pub fn remaining(window: Duration, elapsed: Duration) -> Duration {
    window.saturating_sub(elapsed)
}

/// Sleeps out the remainder of a step window, waking early on stop.
pub async fn wait_remaining(window: Duration, elapsed: Duration, stop: &StopSignal) -> PaceOutcome {
    let left = remaining(window, elapsed);
    if left.is_zero() {
        return PaceOutcome::Overrun(elapsed.saturating_sub(window));
    }

    tokio::select! {
        () = tokio::time::sleep(left) => PaceOutcome::Slept(left),
        () = stop.stopped() => PaceOutcome::Interrupted,
    }
}
