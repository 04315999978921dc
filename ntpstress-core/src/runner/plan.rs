use std::num::NonZeroU64;
use std::time::Duration;

use super::error::{Error, Result};

/// Ascending rate steps `start, start+increment, ...` bounded by `max` (inclusive).
///
/// The last step is the largest reachable value `<= max`; it is never snapped to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePlan {
    start: NonZeroU64,
    max: u64,
    increment: NonZeroU64,
}

impl RatePlan {
    pub fn new(start: u64, max: u64, increment: u64) -> Result<Self> {
        let start = NonZeroU64::new(start).ok_or(Error::InvalidStartRate)?;
        let increment = NonZeroU64::new(increment).ok_or(Error::InvalidIncrement)?;
        Ok(Self {
            start,
            max,
            increment,
        })
    }

    pub fn len(&self) -> u64 {
        let start = self.start.get();
        if self.max < start {
            return 0;
        }
        (self.max - start) / self.increment.get() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_rate(&self) -> Option<NonZeroU64> {
        let steps = self.len().checked_sub(1)?;
        let last = self.start.get() + steps * self.increment.get();
        NonZeroU64::new(last)
    }

    /// Steps times window, or `None` when the product does not fit in a `Duration`.
    pub fn estimated_duration(&self, window: Duration) -> Option<Duration> {
        const NANOS_PER_SEC: u128 = 1_000_000_000;

        let nanos = window.as_nanos().checked_mul(u128::from(self.len()))?;
        let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
        Some(Duration::new(secs, (nanos % NANOS_PER_SEC) as u32))
    }

    pub fn rates(&self) -> Rates {
        Rates {
            next: (self.start.get() <= self.max).then_some(self.start),
            max: self.max,
            increment: self.increment,
        }
    }
}

impl IntoIterator for &RatePlan {
    type Item = NonZeroU64;
    type IntoIter = Rates;

    fn into_iter(self) -> Rates {
        self.rates()
    }
}

#[derive(Debug, Clone)]
pub struct Rates {
    next: Option<NonZeroU64>,
    max: u64,
    increment: NonZeroU64,
}

impl Iterator for Rates {
    type Item = NonZeroU64;

    fn next(&mut self) -> Option<NonZeroU64> {
        let cur = self.next?;
        self.next = cur
            .checked_add(self.increment.get())
            .filter(|n| n.get() <= self.max);
        Some(cur)
    }
}
