use std::time::Duration;

/// Fail percentage with two decimals, or `n/a` when undefined.
pub(crate) fn format_percent(p: Option<f64>) -> String {
    match p {
        Some(v) if v.is_finite() => format!("{v:.2}%"),
        _ => "n/a".to_string(),
    }
}

pub(crate) fn format_duration(d: Duration) -> String {
    // Single rounded component in one of: us, ms, s.
    let total_ns = d.as_nanos();

    const NS_PER_US: u128 = 1_000;
    const NS_PER_MS: u128 = 1_000_000;
    const NS_PER_S: u128 = 1_000_000_000;

    fn round_div(value: u128, unit: u128) -> u128 {
        (value + (unit / 2)) / unit
    }

    if total_ns >= 60 * NS_PER_S {
        let secs = u64::try_from(round_div(total_ns, NS_PER_S)).unwrap_or(u64::MAX);
        return humantime::format_duration(Duration::from_secs(secs)).to_string();
    }
    if total_ns >= NS_PER_S {
        return format!("{}s", round_div(total_ns, NS_PER_S));
    }
    if total_ns >= NS_PER_MS {
        return format!("{}ms", round_div(total_ns, NS_PER_MS));
    }
    format!("{}us", round_div(total_ns, NS_PER_US))
}

/// Estimated run length; `unbounded` when it does not fit in a `Duration`.
pub(crate) fn format_estimate(estimate: Option<Duration>) -> String {
    match estimate {
        Some(d) => humantime::format_duration(d).to_string(),
        None => "unbounded".to_string(),
    }
}

/// One line per completed step.
pub(crate) fn step_line(
    rate: u64,
    attempted: u64,
    failed: u64,
    fail_percent: Option<f64>,
    overrun: Option<Duration>,
) -> String {
    let mut line = format!(
        "rate={rate} attempted={attempted} failed={failed} fail={}",
        format_percent(fail_percent)
    );
    if let Some(over) = overrun {
        line.push_str(&format!(" overrun={}", format_duration(over)));
    }
    line
}
