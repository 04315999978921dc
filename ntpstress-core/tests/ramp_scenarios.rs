use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ntpstress_core::{
    FailureKind, Probe, ProbeFuture, ProbeOutcome, RampController, RunConfig, RunReport,
    StepFn, StepUpdate, StopSignal,
};

struct Fixed(ProbeOutcome);

impl Probe for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn probe<'a>(&'a self, _server: &'a str) -> ProbeFuture<'a> {
        let outcome = self.0;
        Box::pin(async move { outcome })
    }
}

struct EveryNthFails {
    n: u64,
    calls: AtomicU64,
}

impl Probe for EveryNthFails {
    fn name(&self) -> &'static str {
        "every_nth_fails"
    }

    fn probe<'a>(&'a self, _server: &'a str) -> ProbeFuture<'a> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
            if call % self.n == 0 {
                ProbeOutcome::Failure(FailureKind::Io)
            } else {
                ProbeOutcome::Success
            }
        })
    }
}

fn config(start: u64, max: u64, increment: u64, window: Duration) -> RunConfig {
    RunConfig {
        server: Arc::from("time.test"),
        start_rate: start,
        max_rate: max,
        increment,
        window,
    }
}

async fn run(cfg: RunConfig, probe: Arc<dyn Probe>) -> RunReport {
    let mut ctl = RampController::new(cfg).unwrap_or_else(|e| panic!("invalid config: {e}"));
    ctl.run(probe, &StopSignal::new(), None)
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"))
}

fn triples(report: &RunReport) -> Vec<(u64, u64, u64, Option<f64>)> {
    report
        .series
        .iter()
        .map(|s| (s.rate.get(), s.attempted, s.failed, s.fail_percent()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn always_succeeding_probe() {
    let report = run(
        config(1, 3, 1, Duration::from_secs(1)),
        Arc::new(Fixed(ProbeOutcome::Success)),
    )
    .await;

    assert_eq!(
        triples(&report),
        vec![
            (1, 1, 0, Some(0.0)),
            (2, 2, 0, Some(0.0)),
            (3, 3, 0, Some(0.0)),
        ]
    );
    assert_eq!(report.final_fail_percent(), Some(0.0));
    assert!(!report.cancelled);
}

#[tokio::test(start_paused = true)]
async fn always_failing_probe() {
    let report = run(
        config(1, 3, 1, Duration::from_secs(1)),
        Arc::new(Fixed(ProbeOutcome::Failure(FailureKind::Timeout))),
    )
    .await;

    assert_eq!(
        triples(&report),
        vec![
            (1, 1, 1, Some(100.0)),
            (2, 2, 2, Some(100.0)),
            (3, 3, 3, Some(100.0)),
        ]
    );
    assert_eq!(report.final_fail_percent(), Some(100.0));
}

#[tokio::test(start_paused = true)]
async fn max_below_start_runs_no_steps() {
    let report = run(
        config(5, 1, 1, Duration::from_secs(1)),
        Arc::new(Fixed(ProbeOutcome::Success)),
    )
    .await;

    assert!(report.series.is_empty());
    assert_eq!(report.totals.attempted, 0);
    assert_eq!(report.final_fail_percent(), None);
}

#[tokio::test(start_paused = true)]
async fn step_count_and_rates_follow_the_plan() {
    for (start, max, inc) in [(1, 10, 1), (2, 20, 5), (7, 7, 3), (1, 100, 33)] {
        let report = run(
            config(start, max, inc, Duration::from_millis(10)),
            Arc::new(Fixed(ProbeOutcome::Success)),
        )
        .await;

        let expected: Vec<u64> = (0..)
            .map(|k| start + k * inc)
            .take_while(|r| *r <= max)
            .collect();
        let got: Vec<u64> = report.series.iter().map(|s| s.rate.get()).collect();
        assert_eq!(got, expected, "{start}..={max} by {inc}");
        assert_eq!(got.len() as u64, (max - start) / inc + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn totals_are_the_sum_of_the_series() {
    let report = run(
        config(10, 50, 10, Duration::from_millis(50)),
        Arc::new(EveryNthFails {
            n: 3,
            calls: AtomicU64::new(0),
        }),
    )
    .await;

    let attempted: u64 = report.series.iter().map(|s| s.attempted).sum();
    let failed: u64 = report.series.iter().map(|s| s.failed).sum();
    assert_eq!(report.totals.attempted, attempted);
    assert_eq!(report.totals.failed, failed);
    assert_eq!(attempted, 150);
    assert_eq!(failed, 50);
    for s in &report.series {
        assert_eq!(s.attempted, s.rate.get());
    }
}

#[tokio::test(start_paused = true)]
async fn step_callback_sees_every_step_in_order() {
    let seen: Arc<Mutex<Vec<StepUpdate>>> = Arc::default();
    let sink = seen.clone();
    let on_step: StepFn = Arc::new(move |u: StepUpdate| {
        if let Ok(mut v) = sink.lock() {
            v.push(u);
        }
    });

    let mut ctl = RampController::new(config(1, 4, 1, Duration::from_millis(100)))
        .unwrap_or_else(|e| panic!("invalid config: {e}"));
    let report = ctl
        .run(
            Arc::new(Fixed(ProbeOutcome::Success)),
            &StopSignal::new(),
            Some(on_step),
        )
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    let seen = seen.lock().unwrap_or_else(|e| e.into_inner());
    assert_eq!(seen.len(), 4);
    for (i, u) in seen.iter().enumerate() {
        assert_eq!(u.index, i as u64 + 1);
        assert_eq!(u.steps_total, 4);
        assert_eq!(u.step.rate.get(), i as u64 + 1);
        assert_eq!(u.overrun, None);
    }
    assert!(seen[3].is_last());
    assert_eq!(seen[3].totals, report.totals);
}

#[tokio::test(start_paused = true)]
async fn stop_during_pacing_ends_the_run_early() {
    let stop = StopSignal::new();
    let trigger = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        trigger.stop();
    });

    let mut ctl = RampController::new(config(1, 100, 1, Duration::from_secs(1)))
        .unwrap_or_else(|e| panic!("invalid config: {e}"));
    let report = ctl
        .run(Arc::new(Fixed(ProbeOutcome::Success)), &stop, None)
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert!(report.cancelled);
    assert_eq!(report.series.len(), 3);
    assert_eq!(report.totals.attempted, 1 + 2 + 3);
    assert!(report.elapsed < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn stop_before_start_runs_nothing() {
    let stop = StopSignal::new();
    stop.stop();

    let mut ctl = RampController::new(config(1, 3, 1, Duration::from_secs(1)))
        .unwrap_or_else(|e| panic!("invalid config: {e}"));
    let report = ctl
        .run(Arc::new(Fixed(ProbeOutcome::Success)), &stop, None)
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert!(report.cancelled);
    assert!(report.series.is_empty());
    assert_eq!(report.final_fail_percent(), None);
}
