use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use ntpstress_core::RunConfig;

use crate::output::format_estimate;

/// Line-oriented settings dialog. Every answer falls back to the current value.
pub(crate) struct Prompter<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub(crate) fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    /// Asks for every setting until the user confirms with `yes`.
    /// With `confirm == false` the first round is accepted as is.
    pub(crate) fn collect(&mut self, mut cfg: RunConfig, confirm: bool) -> anyhow::Result<RunConfig> {
        writeln!(self.out, "NTP Server Stress Test")?;

        loop {
            cfg = self.ask_round(cfg)?;

            let estimate = cfg.estimated_duration()?;
            writeln!(self.out)?;
            writeln!(self.out, "Test configuration:")?;
            writeln!(self.out, "NTP server: {}", cfg.server)?;
            writeln!(self.out, "Starting request rate: {} requests/sec", cfg.start_rate)?;
            writeln!(self.out, "Maximum request rate: {} requests/sec", cfg.max_rate)?;
            writeln!(self.out, "Increment rate: {} requests/sec", cfg.increment)?;
            writeln!(
                self.out,
                "Duration per increment: {}",
                humantime::format_duration(cfg.window)
            )?;
            writeln!(
                self.out,
                "Estimated total test duration: {}",
                format_estimate(estimate)
            )?;

            if !confirm {
                return Ok(cfg);
            }

            let answer = self
                .ask("Do you want to proceed with these settings? (yes/no): ")?
                .context("input closed before the settings were confirmed")?;
            if answer.eq_ignore_ascii_case("yes") {
                return Ok(cfg);
            }
            writeln!(self.out, "Let's try setting the parameters again.")?;
        }
    }

    fn ask_round(&mut self, cfg: RunConfig) -> anyhow::Result<RunConfig> {
        let server = match self.ask_or_default(&format!(
            "Enter the NTP server (default: {}): ",
            cfg.server
        ))? {
            Some(s) => Arc::from(s),
            None => cfg.server.clone(),
        };

        let start_rate = self.ask_number(
            "Enter the starting request rate (requests per second)",
            "start rate",
            cfg.start_rate,
            |v| v > 0,
        )?;
        let max_rate = self.ask_number(
            "Enter the maximum request rate (requests per second)",
            "max rate",
            cfg.max_rate,
            |_| true,
        )?;
        let increment = self.ask_number(
            "Enter the increment rate (requests per second)",
            "increment",
            cfg.increment,
            |v| v > 0,
        )?;
        let window = self.ask_window(cfg.window)?;

        Ok(RunConfig {
            server,
            start_rate,
            max_rate,
            increment,
            window,
        })
    }

    fn ask_number(
        &mut self,
        question: &str,
        what: &str,
        default: u64,
        valid: impl Fn(u64) -> bool,
    ) -> anyhow::Result<u64> {
        let Some(raw) = self.ask_or_default(&format!("{question} (default: {default}): "))? else {
            return Ok(default);
        };
        match raw.parse::<u64>() {
            Ok(v) if valid(v) => Ok(v),
            _ => {
                writeln!(self.out, "Invalid input. Using default {what} of {default}.")?;
                Ok(default)
            }
        }
    }

    fn ask_window(&mut self, default: Duration) -> anyhow::Result<Duration> {
        let shown = humantime::format_duration(default);
        let Some(raw) = self.ask_or_default(&format!(
            "Enter the duration for each increment (seconds) (default: {shown}): "
        ))?
        else {
            return Ok(default);
        };

        let parsed = match raw.parse::<u64>() {
            Ok(secs) => Ok(Duration::from_secs(secs)),
            Err(_) => humantime::parse_duration(&raw),
        };
        match parsed {
            Ok(d) if !d.is_zero() => Ok(d),
            _ => {
                writeln!(self.out, "Invalid input. Using default duration of {shown}.")?;
                Ok(default)
            }
        }
    }

    /// `None` for an empty answer. Closed input also falls back to the default.
    fn ask_or_default(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        Ok(self.ask(prompt)?.filter(|s| !s.is_empty()))
    }

    /// Trimmed answer, or `None` once input is closed.
    fn ask(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;

        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .context("failed to read from stdin")?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
