//! PNG rendering for the EDA figures.
//!
//! Every chart is a fixed 1200x800 bitmap drawn with [`plotters`]. Callers hand
//! over already-aggregated data; nothing here touches the input table.

use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

const SIZE: (u32, u32) = (1200, 800);
const CAPTION_FONT: (&str, u32) = ("sans-serif", 40);
const LABEL_FONT: (&str, u32) = ("sans-serif", 20);
const DESC_FONT: (&str, u32) = ("sans-serif", 26);

/// Errors that can occur during plot generation
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

type Result<T> = core::result::Result<T, PlotError>;

/// Short tick labels for values spanning several orders of magnitude.
fn format_axis_value(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}G", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}k", value / 1e3)
    } else if abs >= 1.0 || abs == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Horizontal bar chart, one bar per `(label, value)`; the first entry is drawn at the top.
pub fn horizontal_bar_chart(
    bars: &[(String, f64)],
    title: &str,
    x_label: &str,
    output_path: &Path,
) -> Result<()> {
    if bars.is_empty() {
        return Err(PlotError::InvalidData("no bars to draw".to_string()));
    }
    if let Some((label, _)) = bars.iter().find(|(_, v)| !v.is_finite()) {
        return Err(PlotError::InvalidData(format!(
            "bar '{}' has a non-finite value",
            label
        )));
    }

    let root = BitMapBackend::new(output_path, SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let n = bars.len();
    let x_min = bars.iter().map(|(_, v)| *v).fold(0.0, f64::min);
    let x_max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let x_max = if x_max > x_min { x_max * 1.05 } else { x_min + 1.0 };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(200)
        .build_cartesian_2d(x_min..x_max, (0..n as i32).into_segmented())
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    // slot 0 is the bottom of the y axis, so the ranking is flipped
    let label_of = |v: &SegmentValue<i32>| match v {
        SegmentValue::Exact(slot) | SegmentValue::CenterOf(slot) => {
            usize::try_from(n as i32 - 1 - *slot)
                .ok()
                .and_then(|rank| bars.get(rank))
                .map(|(label, _)| label.clone())
                .unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    };

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc(x_label)
        .y_labels(n)
        .y_label_formatter(&label_of)
        .label_style(LABEL_FONT)
        .axis_desc_style(DESC_FONT)
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart
        .draw_series(bars.iter().enumerate().map(|(rank, (_, value))| {
            let slot = (n - 1 - rank) as i32;
            let mut bar = Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(slot)),
                    (*value, SegmentValue::Exact(slot + 1)),
                ],
                BLUE.mix(0.7).filled(),
            );
            bar.set_margin(4, 4, 0, 0);
            bar
        }))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}

/// Histogram on a base-10 logarithmic x axis with a linear count axis.
///
/// `edges` are the `counts.len() + 1` bin boundaries and must all be positive.
pub fn log_histogram(
    edges: &[f64],
    counts: &[u64],
    title: &str,
    x_label: &str,
    output_path: &Path,
) -> Result<()> {
    if counts.is_empty() || edges.len() != counts.len() + 1 {
        return Err(PlotError::InvalidData(format!(
            "{} edges do not bound {} bins",
            edges.len(),
            counts.len()
        )));
    }
    if edges.iter().any(|e| !(e.is_finite() && *e > 0.0)) {
        return Err(PlotError::InvalidData(
            "bin edges must be positive on a log axis".to_string(),
        ));
    }

    let root = BitMapBackend::new(output_path, SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let x_min = edges[0];
    let x_max = edges[edges.len() - 1];
    let y_max = counts.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.05;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(85)
        .build_cartesian_2d((x_min..x_max).log_scale(), 0.0..y_max)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc("Count")
        .x_label_formatter(&|x| format_axis_value(*x))
        .y_label_formatter(&|y| format!("{:.0}", y))
        .label_style(LABEL_FONT)
        .axis_desc_style(DESC_FONT)
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, &count)| {
            Rectangle::new(
                [(edges[i], 0.0), (edges[i + 1], count as f64)],
                BLUE.mix(0.6).filled(),
            )
        }))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}

/// Line chart with a marker on every point, x positions taken in slice order.
pub fn line_chart_with_markers(
    points: &[(String, f64)],
    title: &str,
    y_label: &str,
    output_path: &Path,
) -> Result<()> {
    if points.is_empty() {
        return Err(PlotError::InvalidData("no points to draw".to_string()));
    }

    let root = BitMapBackend::new(output_path, SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let n = points.len();
    let y_lo = points.iter().map(|(_, v)| *v).fold(0.0, f64::min);
    let y_hi = points.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let y_hi = if y_hi > y_lo { y_hi * 1.1 } else { y_lo + 1.0 };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(100)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), y_lo..y_hi)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    // ticks that do not land on a point stay unlabelled
    let label_of = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        points
            .get(idx as usize)
            .map(|(label, _)| label.clone())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .x_desc("TransactionMonth")
        .y_desc(y_label)
        .x_labels(n.min(12))
        .x_label_formatter(&label_of)
        .y_label_formatter(&|y| format_axis_value(*y))
        .label_style(LABEL_FONT)
        .axis_desc_style(DESC_FONT)
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    let series: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, (_, v))| (i as f64, *v))
        .collect();

    chart
        .draw_series(LineSeries::new(series.iter().copied(), BLUE.stroke_width(2)))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    chart
        .draw_series(
            series
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 5, BLUE.filled())),
        )
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}
