use std::fmt::Write as _;

use ntpstress_core::{RunReport, StepResult};

use super::format::{format_duration, format_percent};

pub(crate) fn render(report: &RunReport) -> String {
    let mut out = String::new();

    if report.is_empty() {
        out.push_str("summary: no steps were run\n");
        writeln!(
            &mut out,
            "  fail: {}",
            format_percent(report.final_fail_percent())
        )
        .ok();
        return out;
    }

    out.push_str("summary\n");
    let t = &report.totals;
    let status = if report.cancelled { " (interrupted)" } else { "" };
    writeln!(&mut out, "  steps: {}{status}", t.steps).ok();
    writeln!(&mut out, "  requests: {} (failed {})", t.attempted, t.failed).ok();
    writeln!(
        &mut out,
        "  fail: {}",
        format_percent(report.final_fail_percent())
    )
    .ok();
    writeln!(&mut out, "  elapsed: {}", format_duration(report.elapsed)).ok();

    if let Some(first) = report.series.iter().find(|s| s.failed > 0) {
        writeln!(&mut out, "  first failures: {}", describe(first)).ok();
    }
    if let Some(worst) = worst_step(&report.series) {
        writeln!(&mut out, "  worst step: {}", describe(worst)).ok();
    }

    out
}

/// Step with the highest defined fail percentage; the earliest one wins ties.
fn worst_step(series: &[StepResult]) -> Option<&StepResult> {
    series
        .iter()
        .filter(|s| s.failed > 0)
        .filter_map(|s| s.fail_percent().map(|p| (s, p)))
        .fold(None, |best: Option<(&StepResult, f64)>, (s, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((s, p)),
        })
        .map(|(s, _)| s)
}

fn describe(step: &StepResult) -> String {
    format!(
        "rate={} failed={} fail={}",
        step.rate,
        step.failed,
        format_percent(step.fail_percent())
    )
}
