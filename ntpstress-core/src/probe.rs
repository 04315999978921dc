use std::future::Future;
use std::pin::Pin;

pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = ProbeOutcome> + Send + 'a>>;

/// Why a single probe did not succeed.
///
/// The runner only counts failures; the kind is kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    Resolve,
    Io,
    Timeout,
    InvalidResponse,
    KissOfDeath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Failure(FailureKind),
}

impl ProbeOutcome {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A single request against the target service.
///
/// Implementations own their own timeout policy. A probe that never resolves
/// stalls the burst it belongs to.
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;

    fn probe<'a>(&'a self, server: &'a str) -> ProbeFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_renders_snake_case() {
        assert_eq!(FailureKind::KissOfDeath.to_string(), "kiss_of_death");
        assert_eq!(FailureKind::InvalidResponse.to_string(), "invalid_response");
        assert_eq!("timeout".parse::<FailureKind>(), Ok(FailureKind::Timeout));
    }

    #[test]
    fn only_success_is_success() {
        assert!(ProbeOutcome::Success.is_success());
        assert!(!ProbeOutcome::Failure(FailureKind::Io).is_success());
        assert!(!ProbeOutcome::Failure(FailureKind::Timeout).is_success());
    }
}
