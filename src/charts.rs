//! Chart rendering onto PNG files or in-memory SVG documents.
//!
//! Text is drawn with an embedded DejaVu Sans face registered with
//! `plotters` on first use, so no system font lookup happens.

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontStyle;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::PresentError;

static FONT_BYTES: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

const FONT: &str = "sans-serif";
pub const PNG_SIZE: (u32, u32) = (1200, 700);
pub const SVG_SIZE: (u32, u32) = (820, 560);

/// Line chart with years on the x axis, one line per group.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub series: Vec<(String, Vec<(i32, f64)>)>,
}

/// Horizontal bar chart; the first bar is drawn at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub bars: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Line(LineChart),
    Bar(BarChart),
}

/// Outcome of a render call. Empty input yields a warning instead of a chart.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<T> {
    Chart(T),
    Warning(String),
}

impl<T> Rendered<T> {
    pub fn is_chart(&self) -> bool {
        matches!(self, Rendered::Chart(_))
    }
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::Line(c) => &c.title,
            Chart::Bar(c) => &c.title,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Chart::Line(c) => c.series.iter().all(|(_, points)| points.is_empty()),
            Chart::Bar(c) => c.bars.is_empty(),
        }
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), PresentError> {
        root.fill(&WHITE).map_err(render_err)?;
        match self {
            Chart::Line(c) => draw_line(root, c)?,
            Chart::Bar(c) => draw_bar(root, c)?,
        }
        root.present().map_err(render_err)
    }

    fn empty_warning(&self) -> Option<String> {
        if !self.is_empty() {
            return None;
        }
        warn!(title = self.title(), "Chart skipped: no data");
        Some(format!("Sem dados para exibir: {}", self.title()))
    }
}

/// Registers the embedded font with `plotters`. Safe to call repeatedly.
pub fn ensure_font() -> Result<(), PresentError> {
    let registered = *FONT_REGISTERED.get_or_init(|| {
        plotters::style::register_font(FONT, FontStyle::Normal, FONT_BYTES).is_ok()
    });
    if registered {
        Ok(())
    } else {
        Err(PresentError::Font)
    }
}

/// Renders `chart` to a PNG file at `path`.
pub fn render_png(chart: &Chart, path: &Path) -> Result<Rendered<PathBuf>, PresentError> {
    if let Some(warning) = chart.empty_warning() {
        return Ok(Rendered::Warning(warning));
    }
    ensure_font()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    {
        let root = BitMapBackend::new(path, PNG_SIZE).into_drawing_area();
        chart.draw(&root)?;
    }
    debug!(path = %path.display(), "Chart written");
    Ok(Rendered::Chart(path.to_path_buf()))
}

/// Renders `chart` to an SVG document.
pub fn render_svg(chart: &Chart) -> Result<Rendered<String>, PresentError> {
    if let Some(warning) = chart.empty_warning() {
        return Ok(Rendered::Warning(warning));
    }
    ensure_font()?;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SVG_SIZE).into_drawing_area();
        chart.draw(&root)?;
    }
    Ok(Rendered::Chart(svg))
}

fn render_err<E: std::fmt::Display>(e: E) -> PresentError {
    PresentError::Render(e.to_string())
}

/// Upper bound for a value axis with some headroom above the largest value.
fn value_axis_max(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(0.0_f64, f64::max);
    if max > 0.0 { max * 1.1 } else { 1.0 }
}

fn draw_line<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &LineChart,
) -> Result<(), PresentError> {
    let years = chart.series.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.0));
    let (min_year, max_year) = years.fold((i32::MAX, i32::MIN), |(lo, hi), y| {
        (lo.min(y), hi.max(y))
    });
    let (x_start, x_end) = if min_year == max_year {
        (min_year - 1, max_year + 1)
    } else {
        (min_year, max_year)
    };
    let y_max = value_axis_max(chart.series.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.1)));

    let mut ctx = ChartBuilder::on(root)
        .caption(chart.title.as_str(), (FONT, 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_start..x_end, 0f64..y_max)
        .map_err(render_err)?;

    let x_labels = ((x_end - x_start + 1) as usize).min(20);
    ctx.configure_mesh()
        .x_desc(chart.x_desc.as_str())
        .y_desc(chart.y_desc.as_str())
        .x_labels(x_labels)
        .x_label_formatter(&|year| year.to_string())
        .label_style((FONT, 14))
        .axis_desc_style((FONT, 16))
        .draw()
        .map_err(render_err)?;

    for (idx, (name, points)) in chart.series.iter().enumerate() {
        let color = Palette99::pick(idx).mix(0.9);
        ctx.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(render_err)?
            .label(name.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
        ctx.draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))
            .map_err(render_err)?;
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font((FONT, 14))
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;

    Ok(())
}

fn draw_bar<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &BarChart,
) -> Result<(), PresentError> {
    let n = chart.bars.len();
    let x_max = value_axis_max(chart.bars.iter().map(|(_, v)| *v));
    // slot 0 is the bottom row of the chart
    let label_for = |slot: i32| -> String {
        n.checked_sub(1 + slot as usize)
            .and_then(|rank| chart.bars.get(rank))
            .map(|(label, _)| label.clone())
            .unwrap_or_default()
    };

    let mut ctx = ChartBuilder::on(root)
        .caption(chart.title.as_str(), (FONT, 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(260)
        .build_cartesian_2d(0f64..x_max, (0..n as i32).into_segmented())
        .map_err(render_err)?;

    ctx.configure_mesh()
        .disable_y_mesh()
        .x_desc(chart.x_desc.as_str())
        .y_desc(chart.y_desc.as_str())
        .y_labels(n)
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(slot) => label_for(*slot),
            _ => String::new(),
        })
        .label_style((FONT, 13))
        .axis_desc_style((FONT, 16))
        .draw()
        .map_err(render_err)?;

    ctx.draw_series(chart.bars.iter().enumerate().map(|(rank, (_, value))| {
        let slot = (n - 1 - rank) as i32;
        let color = Palette99::pick(rank).mix(0.85);
        let mut bar = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(slot)),
                (*value, SegmentValue::Exact(slot + 1)),
            ],
            color.filled(),
        );
        bar.set_margin(3, 3, 0, 0);
        bar
    }))
    .map_err(render_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_chart(series: Vec<(String, Vec<(i32, f64)>)>) -> Chart {
        Chart::Line(LineChart {
            title: "Market share".to_string(),
            x_desc: "Ano".to_string(),
            y_desc: "%".to_string(),
            series,
        })
    }

    fn bar_chart(bars: Vec<(String, f64)>) -> Chart {
        Chart::Bar(BarChart {
            title: "Top bandeiras".to_string(),
            x_desc: "Quantidade de Postos".to_string(),
            y_desc: "Bandeira".to_string(),
            bars,
        })
    }

    #[test]
    fn test_empty_line_chart_warns() {
        let chart = line_chart(vec![("A".to_string(), vec![])]);
        let rendered = render_svg(&chart).unwrap();
        assert!(matches!(rendered, Rendered::Warning(ref w) if w.contains("Market share")));
    }

    #[test]
    fn test_empty_bar_chart_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        let rendered = render_png(&bar_chart(vec![]), &path).unwrap();
        assert!(!rendered.is_chart());
        assert!(!path.exists());
    }

    #[test]
    fn test_line_chart_svg() {
        let chart = line_chart(vec![
            ("AGENTE A".to_string(), vec![(2020, 40.0), (2021, 45.5)]),
            ("AGENTE B".to_string(), vec![(2020, 60.0), (2021, 54.5)]),
        ]);
        match render_svg(&chart).unwrap() {
            Rendered::Chart(svg) => {
                assert!(svg.contains("<svg"));
                assert!(svg.contains("AGENTE A"));
            }
            Rendered::Warning(w) => panic!("unexpected warning: {w}"),
        }
    }

    #[test]
    fn test_single_year_line_chart_renders() {
        let chart = line_chart(vec![("X".to_string(), vec![(2020, 3.0)])]);
        assert!(render_svg(&chart).unwrap().is_chart());
    }

    #[test]
    fn test_bar_chart_png_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charts").join("bandeiras.png");
        let chart = bar_chart(vec![
            ("IPIRANGA".to_string(), 120.0),
            ("BRANCA".to_string(), 80.0),
            ("SHELL".to_string(), 75.0),
        ]);

        let rendered = render_png(&chart, &path).unwrap();
        assert_eq!(rendered, Rendered::Chart(path.clone()));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_value_axis_max() {
        assert_eq!(value_axis_max([0.0, 0.0].into_iter()), 1.0);
        assert!((value_axis_max([2.0, 10.0].into_iter()) - 11.0).abs() < 1e-9);
    }
}
