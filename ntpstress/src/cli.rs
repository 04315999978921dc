use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    // Bare integers are seconds, matching the interactive prompt.
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s)
        .map_err(|err| format!("invalid duration '{s}' (expected e.g. 1s, 500ms, 2m): {err}"))
}

fn parse_percent(input: &str) -> Result<f64, String> {
    let v: f64 = input
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| format!("invalid percentage '{input}'"))?;
    if !(0.0..=100.0).contains(&v) {
        return Err(format!("percentage must be within 0..=100 (got {v})"));
    }
    Ok(v)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Per-step lines, a progress bar and a final summary.
    #[value(name = "human")]
    HumanReadable,
    /// Emit NDJSON step and summary lines to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "ntpstress",
    version,
    about = "Stress test an NTP server with an escalating request rate",
    long_about = "ntpstress probes an NTP server with bursts of concurrent SNTP requests.\n\nEach step sends `rate` requests at once, waits for all of them, then sleeps out the rest of the step window. The rate grows by `--increment` from `--start-rate` up to `--max-rate` (inclusive).\n\nPer-step failure counts are reported as they complete and plotted to two SVG charts at the end.",
    after_help = "Examples:\n  ntpstress run --server time.example.com --max-rate 200 --increment 10\n  ntpstress run --start-rate 50 --max-rate 500 --window 2s --output json\n  ntpstress run --interactive\n  ntpstress run --server 127.0.0.1:1230 --export results.csv --no-charts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a rate ramp against an NTP server
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// NTP server (`host` or `host:port`, default port 123)
    #[arg(long, env = "NTPSTRESS_SERVER", default_value = "pool.ntp.org")]
    pub server: String,

    /// Requests in the first step
    #[arg(long, env = "NTPSTRESS_START_RATE", default_value_t = 1)]
    pub start_rate: u64,

    /// Upper bound for the rate (inclusive)
    #[arg(long, env = "NTPSTRESS_MAX_RATE", default_value_t = 1000)]
    pub max_rate: u64,

    /// Rate added after every step
    #[arg(long, env = "NTPSTRESS_INCREMENT", default_value_t = 1)]
    pub increment: u64,

    /// Length of every step (e.g. 1s, 500ms; bare numbers are seconds)
    #[arg(long, env = "NTPSTRESS_WINDOW", default_value = "1s", value_parser = parse_duration)]
    pub window: Duration,

    /// Per-request timeout of the SNTP probe
    #[arg(long, env = "NTPSTRESS_PROBE_TIMEOUT", default_value = "5s", value_parser = parse_duration)]
    pub probe_timeout: Duration,

    /// Output format
    #[arg(long, value_enum, env = "NTPSTRESS_OUTPUT", default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Directory for the SVG charts (created if missing)
    #[arg(long, env = "NTPSTRESS_CHART_DIR", default_value = ".")]
    pub chart_dir: PathBuf,

    /// Skip writing charts
    #[arg(long)]
    pub no_charts: bool,

    /// Write the full report to a file (.json or .csv)
    #[arg(long, env = "NTPSTRESS_EXPORT", value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Exit with code 11 when the final fail percentage is above this value
    #[arg(long, env = "NTPSTRESS_FAIL_THRESHOLD", value_name = "PERCENT", value_parser = parse_percent)]
    pub fail_threshold: Option<f64>,

    /// Ask for every setting on the terminal, using the flags as defaults
    #[arg(long)]
    pub interactive: bool,

    /// Do not ask for confirmation before starting an interactive run
    #[arg(long, short = 'y')]
    pub yes: bool,
}
