use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use ntpstress_core::RunReport;

/// File stems; each chart is written as `.svg` and `.png`.
const FAILED_CHART_STEM: &str = "ntp_stress_test";
const FAIL_PERCENT_CHART_STEM: &str = "ntp_stress_test_fail_percentage";

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: usize = 5;
const LINE_COLOR: &str = "#d62728";

/// A single-series line chart. `None` values leave a gap in the line.
#[derive(Debug, Clone)]
pub(crate) struct LineChart {
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub legend: &'static str,
    pub points: Vec<(f64, Option<f64>)>,
}

impl LineChart {
    pub(crate) fn failed_requests(report: &RunReport) -> Self {
        Self {
            title: "NTP Server Stress Test",
            x_label: "Request Rate (requests/sec)",
            y_label: "Failed Requests",
            legend: "Failed Requests",
            points: report
                .series
                .iter()
                .map(|s| (s.rate.get() as f64, Some(s.failed as f64)))
                .collect(),
        }
    }

    pub(crate) fn fail_percentages(report: &RunReport) -> Self {
        Self {
            title: "NTP Server Stress Test Fail Percentages",
            x_label: "Request Rate (requests/sec)",
            y_label: "Fail Percentage",
            legend: "Fail Percentage",
            points: report
                .series
                .iter()
                .map(|s| (s.rate.get() as f64, s.fail_percent()))
                .collect(),
        }
    }

    pub(crate) fn render_svg(&self) -> String {
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let x_axis = axis(self.points.iter().map(|(x, _)| *x));
        let y_axis = axis(
            std::iter::once(0.0).chain(self.points.iter().filter_map(|(_, y)| *y)),
        );

        let px = |x: f64| MARGIN_LEFT + (x - x_axis.min) / x_axis.span() * plot_w;
        let py = |y: f64| MARGIN_TOP + plot_h - (y - y_axis.min) / y_axis.span() * plot_h;

        let mut out = String::new();
        writeln!(
            &mut out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
        )
        .ok();
        writeln!(&mut out, r#"<rect width="100%" height="100%" fill="white"/>"#).ok();
        writeln!(
            &mut out,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="18">{}</text>"#,
            WIDTH / 2.0,
            MARGIN_TOP / 2.0 + 6.0,
            self.title
        )
        .ok();

        // Axes frame.
        writeln!(
            &mut out,
            r#"<rect x="{MARGIN_LEFT}" y="{MARGIN_TOP}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#
        )
        .ok();

        for tick in x_axis.ticks() {
            let x = px(tick);
            writeln!(
                &mut out,
                r#"<line x1="{x:.1}" y1="{y0:.1}" x2="{x:.1}" y2="{y1:.1}" stroke="black"/><text x="{x:.1}" y="{ty:.1}" text-anchor="middle">{label}</text>"#,
                y0 = MARGIN_TOP + plot_h,
                y1 = MARGIN_TOP + plot_h + 5.0,
                ty = MARGIN_TOP + plot_h + 20.0,
                label = tick_label(tick),
            )
            .ok();
        }
        for tick in y_axis.ticks() {
            let y = py(tick);
            writeln!(
                &mut out,
                r##"<line x1="{x0:.1}" y1="{y:.1}" x2="{MARGIN_LEFT}" y2="{y:.1}" stroke="black"/><line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{x1:.1}" y2="{y:.1}" stroke="#e0e0e0"/><text x="{tx:.1}" y="{ty:.1}" text-anchor="end">{label}</text>"##,
                x0 = MARGIN_LEFT - 5.0,
                x1 = MARGIN_LEFT + plot_w,
                tx = MARGIN_LEFT - 8.0,
                ty = y + 4.0,
                label = tick_label(tick),
            )
            .ok();
        }

        writeln!(
            &mut out,
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            HEIGHT - 15.0,
            self.x_label
        )
        .ok();
        writeln!(
            &mut out,
            r#"<text x="20" y="{y}" text-anchor="middle" transform="rotate(-90 20 {y})">{}</text>"#,
            self.y_label,
            y = MARGIN_TOP + plot_h / 2.0
        )
        .ok();

        if self.points.is_empty() {
            writeln!(
                &mut out,
                r##"<text x="{}" y="{}" text-anchor="middle" fill="#808080">no data</text>"##,
                MARGIN_LEFT + plot_w / 2.0,
                MARGIN_TOP + plot_h / 2.0
            )
            .ok();
        }

        for segment in segments(&self.points) {
            let pts = segment
                .iter()
                .map(|(x, y)| format!("{:.1},{:.1}", px(*x), py(*y)))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                &mut out,
                r#"<polyline points="{pts}" fill="none" stroke="{LINE_COLOR}" stroke-width="1.5"/>"#
            )
            .ok();
            for (x, y) in segment {
                writeln!(
                    &mut out,
                    r#"<circle cx="{:.1}" cy="{:.1}" r="2.5" fill="{LINE_COLOR}"/>"#,
                    px(x),
                    py(y)
                )
                .ok();
            }
        }

        // Legend, top right inside the frame.
        let lx = MARGIN_LEFT + plot_w - 150.0;
        let ly = MARGIN_TOP + 20.0;
        writeln!(
            &mut out,
            r#"<line x1="{lx}" y1="{ly}" x2="{}" y2="{ly}" stroke="{LINE_COLOR}" stroke-width="1.5"/><text x="{}" y="{}">{}</text>"#,
            lx + 25.0,
            lx + 32.0,
            ly + 4.0,
            self.legend
        )
        .ok();

        out.push_str("</svg>\n");
        out
    }
}

/// Rasterizes a rendered chart to PNG bytes at its native size.
pub(crate) fn render_png(svg: &str, opt: &usvg::Options) -> anyhow::Result<Vec<u8>> {
    let tree = usvg::Tree::from_str(svg, opt).context("failed to parse chart svg")?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .context("chart canvas has zero size")?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    pixmap.encode_png().context("failed to encode chart png")
}

/// Writes both charts into `dir` as SVG and PNG and returns their paths.
pub(crate) async fn write_charts(dir: &Path, report: &RunReport) -> anyhow::Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create chart dir: {}", dir.display()))?;

    let charts = vec![
        (FAILED_CHART_STEM, LineChart::failed_requests(report).render_svg()),
        (FAIL_PERCENT_CHART_STEM, LineChart::fail_percentages(report).render_svg()),
    ];

    let charts = tokio::task::spawn_blocking(move || {
        let mut opt = usvg::Options::default();
        // Without fonts the labels are dropped; lines and markers still render.
        opt.fontdb_mut().load_system_fonts();
        charts
            .into_iter()
            .map(|(stem, svg)| -> anyhow::Result<(&'static str, Vec<u8>, String)> {
                let png = render_png(&svg, &opt)?;
                Ok((stem, png, svg))
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await
    .context("chart rasterizer task failed")??;

    let mut written = Vec::with_capacity(charts.len() * 2);
    for (stem, png, svg) in charts {
        for (path, bytes) in [
            (dir.join(format!("{stem}.svg")), svg.into_bytes()),
            (dir.join(format!("{stem}.png")), png),
        ] {
            tokio::fs::write(&path, bytes)
                .await
                .with_context(|| format!("failed to write chart: {}", path.display()))?;
            written.push(path);
        }
    }
    Ok(written)
}

#[derive(Debug, Clone, Copy)]
struct Axis {
    min: f64,
    max: f64,
    step: f64,
}

impl Axis {
    fn span(&self) -> f64 {
        (self.max - self.min).max(f64::EPSILON)
    }

    fn ticks(&self) -> impl Iterator<Item = f64> {
        let Axis { min, max, step } = *self;
        (0..)
            .map(move |i| min + step * i as f64)
            .take_while(move |v| *v <= max + step * 1e-9)
    }
}

/// Range rounded outward to a 1/2/5 step with roughly `TICKS` intervals.
fn axis(values: impl Iterator<Item = f64>) -> Axis {
    let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        lo = 0.0;
        hi = 1.0;
    }
    if hi - lo < f64::EPSILON {
        hi = lo + 1.0;
    }

    let step = nice_step((hi - lo) / TICKS as f64);
    Axis {
        min: (lo / step).floor() * step,
        max: (hi / step).ceil() * step,
        step,
    }
}

fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn tick_label(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        let s = format!("{v:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Runs of consecutive defined points.
fn segments(points: &[(f64, Option<f64>)]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut cur = Vec::new();
    for (x, y) in points {
        match y {
            Some(y) => cur.push((*x, *y)),
            None if !cur.is_empty() => out.push(std::mem::take(&mut cur)),
            None => {}
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}
