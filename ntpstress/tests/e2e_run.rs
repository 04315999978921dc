use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use anyhow::Context as _;
use ntpstress_testserver::{Behavior, TestServer};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Totals {
    steps: u64,
    attempted: u64,
    failed: u64,
    fail_percent: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StepLine {
    schema: String,
    index: u64,
    steps_total: u64,
    rate: u64,
    attempted: u64,
    failed: u64,
    fail_percent: Option<f64>,
    totals: Totals,
}

#[derive(Debug, Deserialize)]
struct SummaryLine {
    schema: String,
    totals: Totals,
    cancelled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
enum JsonLine {
    #[serde(rename = "step")]
    Step(StepLine),

    #[serde(rename = "summary")]
    Summary(SummaryLine),
}

fn dump(out: &Output) -> String {
    format!(
        "status: {:?}\nstdout:\n{}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    )
}

async fn run_ntpstress(args: Vec<String>) -> anyhow::Result<Output> {
    let exe = env!("CARGO_BIN_EXE_ntpstress");
    tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .args(&args)
            .env_remove("RUST_LOG")
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run ntpstress binary")
}

fn args(server: &str, rest: &[&str]) -> Vec<String> {
    ["run", "--server", server]
        .iter()
        .chain(rest)
        .map(|s| s.to_string())
        .collect()
}

#[tokio::test]
async fn human_run_prints_steps_and_writes_artifacts() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir().context("tempdir")?;
    let charts = dir.path().join("charts");
    let export = dir.path().join("out/report.json");

    let out = run_ntpstress(args(
        &server.target(),
        &[
            "--start-rate",
            "1",
            "--max-rate",
            "3",
            "--window",
            "100ms",
            "--probe-timeout",
            "1s",
            "--chart-dir",
            charts.to_str().context("utf8 path")?,
            "--export",
            export.to_str().context("utf8 path")?,
        ],
    ))
    .await?;
    server.shutdown().await;

    anyhow::ensure!(out.status.success(), "{}", dump(&out));
    let stdout = String::from_utf8_lossy(&out.stdout);
    for line in [
        "rate=1 attempted=1 failed=0 fail=0.00%",
        "rate=2 attempted=2 failed=0 fail=0.00%",
        "rate=3 attempted=3 failed=0 fail=0.00%",
        "  requests: 6 (failed 0)",
        "  fail: 0.00%",
    ] {
        anyhow::ensure!(stdout.contains(line), "missing `{line}`\n{}", dump(&out));
    }

    for name in ["ntp_stress_test.svg", "ntp_stress_test_fail_percentage.svg"] {
        let svg = std::fs::read_to_string(charts.join(name))
            .with_context(|| format!("read chart {name}"))?;
        anyhow::ensure!(svg.starts_with("<svg"), "{name} is not svg");
        anyhow::ensure!(svg.matches("<circle").count() == 3, "{name} should plot 3 points");
    }
    for name in ["ntp_stress_test.png", "ntp_stress_test_fail_percentage.png"] {
        let png = std::fs::read(charts.join(name)).with_context(|| format!("read chart {name}"))?;
        anyhow::ensure!(png.starts_with(b"\x89PNG\r\n\x1a\n"), "{name} is not png");
    }
    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(stderr.matches("chart=").count() == 4, "{}", dump(&out));

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export).context("read export")?)
            .context("parse export")?;
    anyhow::ensure!(doc["schema"] == "ntpstress.report.v1", "{doc}");
    anyhow::ensure!(doc["steps"].as_array().map(Vec::len) == Some(3), "{doc}");
    anyhow::ensure!(doc["totals"]["attempted"] == 6, "{doc}");
    Ok(())
}

#[tokio::test]
async fn json_output_emits_step_and_summary_lines() -> anyhow::Result<()> {
    let server = TestServer::start_with(Behavior::KissOfDeath)
        .await
        .context("start test server")?;

    let out = run_ntpstress(args(
        &server.target(),
        &[
            "--start-rate",
            "1",
            "--max-rate",
            "3",
            "--window",
            "50ms",
            "--probe-timeout",
            "1s",
            "--output",
            "json",
            "--no-charts",
        ],
    ))
    .await?;
    server.shutdown().await;

    anyhow::ensure!(out.status.success(), "{}", dump(&out));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let mut steps = Vec::new();
    let mut summary = None;
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<JsonLine>(line)
            .with_context(|| format!("parse ndjson line: {line}"))?
        {
            JsonLine::Step(s) => steps.push(s),
            JsonLine::Summary(s) => summary = Some(s),
        }
    }

    anyhow::ensure!(steps.len() == 3, "{}", dump(&out));
    for (i, s) in steps.iter().enumerate() {
        let i = i as u64 + 1;
        anyhow::ensure!(s.schema == "ntpstress.ndjson.v1", "bad schema {}", s.schema);
        anyhow::ensure!(s.index == i && s.steps_total == 3, "{s:?}");
        anyhow::ensure!(s.rate == i && s.attempted == i && s.failed == i, "{s:?}");
        anyhow::ensure!(s.fail_percent == Some(100.0), "{s:?}");
        anyhow::ensure!(s.totals.steps == i, "{s:?}");
    }

    let summary = summary.context("missing summary line")?;
    anyhow::ensure!(summary.schema == "ntpstress.ndjson.v1");
    anyhow::ensure!(!summary.cancelled);
    anyhow::ensure!(summary.totals.attempted == 6 && summary.totals.failed == 6);
    anyhow::ensure!(summary.totals.fail_percent == Some(100.0));
    Ok(())
}

#[tokio::test]
async fn lossy_server_failures_show_up_in_csv() -> anyhow::Result<()> {
    let server = TestServer::start_with(Behavior::DropEvery(4))
        .await
        .context("start test server")?;
    let dir = tempfile::tempdir().context("tempdir")?;
    let export = dir.path().join("steps.csv");

    let out = run_ntpstress(args(
        &server.target(),
        &[
            "--start-rate",
            "4",
            "--max-rate",
            "8",
            "--increment",
            "4",
            "--window",
            "100ms",
            "--probe-timeout",
            "300ms",
            "--no-charts",
            "--export",
            export.to_str().context("utf8 path")?,
        ],
    ))
    .await?;
    server.shutdown().await;

    anyhow::ensure!(out.status.success(), "{}", dump(&out));
    let csv = std::fs::read_to_string(&export).context("read csv")?;
    let rows: Vec<Vec<&str>> = csv.lines().skip(1).map(|l| l.split(',').collect()).collect();
    anyhow::ensure!(rows.len() == 2, "{csv}");
    anyhow::ensure!(rows[0][..4] == ["4", "4", "1", "25.0000"], "{csv}");
    anyhow::ensure!(rows[1][..4] == ["8", "8", "2", "25.0000"], "{csv}");
    Ok(())
}

#[tokio::test]
async fn max_below_start_is_an_empty_successful_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;

    let out = run_ntpstress(args(
        "127.0.0.1:9",
        &[
            "--start-rate",
            "5",
            "--max-rate",
            "1",
            "--chart-dir",
            dir.path().to_str().context("utf8 path")?,
        ],
    ))
    .await?;

    anyhow::ensure!(out.status.success(), "{}", dump(&out));
    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(stdout.contains("no steps were run"), "{}", dump(&out));
    anyhow::ensure!(stdout.contains("fail: n/a"), "{}", dump(&out));

    let svg = std::fs::read_to_string(Path::new(dir.path()).join("ntp_stress_test.svg"))
        .context("read chart")?;
    anyhow::ensure!(svg.contains("no data"), "empty chart should say so");
    Ok(())
}

#[tokio::test]
async fn interactive_prompts_drive_the_run() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let answers = format!("{}\n2\n3\n1\n50ms\nno\n\n1\n\n\n\nyes\n", server.target());
    let exe = env!("CARGO_BIN_EXE_ntpstress");

    let out = tokio::task::spawn_blocking(move || -> anyhow::Result<Output> {
        let mut child = Command::new(exe)
            .args(["run", "--interactive", "--no-charts", "--probe-timeout", "1s"])
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("spawn ntpstress")?;
        child
            .stdin
            .take()
            .context("child stdin")?
            .write_all(answers.as_bytes())
            .context("write answers")?;
        child.wait_with_output().context("wait for ntpstress")
    })
    .await
    .context("spawn_blocking join")??;
    server.shutdown().await;

    anyhow::ensure!(out.status.success(), "{}", dump(&out));
    let stdout = String::from_utf8_lossy(&out.stdout);
    for needle in [
        "Let's try setting the parameters again.",
        "Starting request rate: 1 requests/sec",
        "Estimated total test duration: 150ms",
        "rate=1 attempted=1 failed=0 fail=0.00%",
        "rate=3 attempted=3 failed=0 fail=0.00%",
    ] {
        anyhow::ensure!(stdout.contains(needle), "missing `{needle}`\n{}", dump(&out));
    }
    anyhow::ensure!(!stdout.contains("rate=4"), "{}", dump(&out));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn ctrl_c_stops_the_run_and_still_writes_artifacts() -> anyhow::Result<()> {
    use std::io::{BufRead as _, BufReader};

    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir().context("tempdir")?;
    let charts = dir.path().join("charts");
    let run_args = args(
        &server.target(),
        &[
            "--start-rate",
            "1",
            "--max-rate",
            "1000",
            "--window",
            "200ms",
            "--probe-timeout",
            "1s",
            "--output",
            "json",
            "--chart-dir",
            charts.to_str().context("utf8 path")?,
        ],
    );
    let exe = env!("CARGO_BIN_EXE_ntpstress");

    let (status, stdout) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let mut child = Command::new(exe)
            .args(&run_args)
            .env_remove("RUST_LOG")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("spawn ntpstress")?;
        let mut lines = BufReader::new(child.stdout.take().context("child stdout")?).lines();

        // Two completed steps guarantee the signal listener is in place.
        let mut seen = Vec::new();
        for line in lines.by_ref().take(2) {
            seen.push(line.context("read step line")?);
        }
        let sent = Command::new("kill")
            .args(["-INT", &child.id().to_string()])
            .status()
            .context("send SIGINT")?;
        anyhow::ensure!(sent.success(), "kill -INT failed: {sent:?}");

        for line in lines {
            seen.push(line.context("read ndjson line")?);
        }
        let status = child.wait().context("wait for ntpstress")?;
        Ok((status, seen))
    })
    .await
    .context("spawn_blocking join")??;
    server.shutdown().await;

    anyhow::ensure!(status.code() == Some(130), "status {status:?}\n{}", stdout.join("\n"));

    let mut steps = 0;
    let mut summary = None;
    for line in stdout.iter().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<JsonLine>(line)
            .with_context(|| format!("parse ndjson line: {line}"))?
        {
            JsonLine::Step(_) => steps += 1,
            JsonLine::Summary(s) => summary = Some(s),
        }
    }
    let summary = summary.context("missing summary line")?;
    anyhow::ensure!(summary.cancelled, "summary should be marked cancelled");
    anyhow::ensure!(summary.totals.steps == steps, "{steps} step lines vs {:?}", summary.totals);
    anyhow::ensure!((2..1000).contains(&steps), "run should stop early, saw {steps} steps");

    for name in [
        "ntp_stress_test.svg",
        "ntp_stress_test.png",
        "ntp_stress_test_fail_percentage.svg",
        "ntp_stress_test_fail_percentage.png",
    ] {
        anyhow::ensure!(charts.join(name).is_file(), "missing chart {name}");
    }
    Ok(())
}
