use std::sync::Arc;

use ntpstress_core::{Probe, RampController, RunConfig, SntpProbe, StopSignal};

use crate::cli::{OutputFormat, RunArgs};
use crate::exit_codes::ExitCode;
use crate::output;
use crate::prompt::Prompter;
use crate::report::{ExportFormat, write_charts, write_export};
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    if let Some(path) = &args.export {
        ExportFormat::from_path(path).map_err(RunError::InvalidInput)?;
    }

    let mut cfg = run_config(&args);
    if args.interactive {
        cfg = prompt_config(cfg, !args.yes, args.output).await?;
    }

    let mut controller = RampController::new(cfg)?;
    let out = output::formatter(args.output);
    if !args.interactive {
        out.print_header(controller.config(), controller.plan());
    }

    let probe: Arc<dyn Probe> = Arc::new(SntpProbe::new().with_timeout(args.probe_timeout));
    let stop = StopSignal::new();
    // Kept until the artifacts are written; a second Ctrl-C there still exits 130.
    let interrupt = spawn_interrupt_handler(stop.clone());

    let report = controller.run(probe, &stop, out.progress()).await?;
    let cfg = controller.config();

    out.print_summary(cfg, &report)
        .map_err(RunError::RuntimeError)?;

    if !args.no_charts {
        let paths = write_charts(&args.chart_dir, &report)
            .await
            .map_err(RunError::RuntimeError)?;
        for path in paths {
            eprintln!("chart={}", path.display());
        }
    }

    if let Some(path) = &args.export {
        write_export(path, cfg, &report)
            .await
            .map_err(RunError::RuntimeError)?;
        eprintln!("export={}", path.display());
    }

    interrupt.abort();

    // A Ctrl-C that lands after the last step still reports an interrupted run.
    let code = ExitCode::from_run(
        report.cancelled || stop.is_stopped(),
        report.final_fail_percent(),
        args.fail_threshold,
    );
    if code == ExitCode::FailThresholdExceeded
        && let (Some(observed), Some(limit)) = (report.final_fail_percent(), args.fail_threshold)
    {
        eprintln!("fail threshold exceeded: {observed:.2}% > {limit}%");
    }
    Ok(code)
}

fn run_config(args: &RunArgs) -> RunConfig {
    RunConfig {
        server: Arc::from(args.server.trim()),
        start_rate: args.start_rate,
        max_rate: args.max_rate,
        increment: args.increment,
        window: args.window,
    }
}

/// Runs the settings dialog on a blocking thread. Prompts go to stderr when
/// stdout carries NDJSON.
async fn prompt_config(
    cfg: RunConfig,
    confirm: bool,
    format: OutputFormat,
) -> Result<RunConfig, RunError> {
    // Flag values become the dialog defaults, so they must already be valid.
    cfg.validate()?;

    tokio::task::spawn_blocking(move || {
        let input = std::io::stdin().lock();
        match format {
            OutputFormat::HumanReadable => {
                Prompter::new(input, std::io::stdout()).collect(cfg, confirm)
            }
            OutputFormat::Json => Prompter::new(input, std::io::stderr()).collect(cfg, confirm),
        }
    })
    .await
    .map_err(|err| RunError::RuntimeError(err.into()))?
    .map_err(RunError::InvalidInput)
}

/// First Ctrl-C stops after the current step; a second one exits immediately.
fn spawn_interrupt_handler(stop: StopSignal) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("failed to listen for Ctrl-C; the run cannot be interrupted cleanly");
            return;
        }
        eprintln!("interrupted: stopping after the current step (Ctrl-C again to abort)");
        stop.stop();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(ExitCode::Interrupted.as_i32());
        }
    })
}
