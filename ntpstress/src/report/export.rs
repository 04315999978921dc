use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context as _;
use ntpstress_core::{RunConfig, RunReport};

use super::ReportDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub(crate) fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => anyhow::bail!(
                "unsupported export extension `{other}` (expected .json or .csv): {}",
                path.display()
            ),
        }
    }
}

pub(crate) async fn write_export(
    path: &Path,
    cfg: &RunConfig,
    report: &RunReport,
) -> anyhow::Result<()> {
    let body = match ExportFormat::from_path(path)? {
        ExportFormat::Json => render_json(cfg, report)?,
        ExportFormat::Csv => render_csv(report),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create export dir: {}", parent.display()))?;
    }
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("failed to write export: {}", path.display()))
}

fn render_json(cfg: &RunConfig, report: &RunReport) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(&ReportDocument::new(cfg, report))
        .context("failed to encode report")?;
    out.push('\n');
    Ok(out)
}

/// One row per step. Undefined percentages are left empty.
fn render_csv(report: &RunReport) -> String {
    let mut out = String::from("rate,attempted,failed,fail_percent,elapsed_ms\n");
    for step in &report.series {
        let pct = step
            .fail_percent()
            .map(|p| format!("{p:.4}"))
            .unwrap_or_default();
        writeln!(
            &mut out,
            "{},{},{},{},{:.3}",
            step.rate,
            step.attempted,
            step.failed,
            pct,
            step.elapsed.as_secs_f64() * 1000.0
        )
        .ok();
    }
    out
}
