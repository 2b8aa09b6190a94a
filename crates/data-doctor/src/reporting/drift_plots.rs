//! Drift charts.
//!
//! [`SvgDriftVisualizer`] draws, per column, an overlaid histogram over bins
//! shared by both datasets and a side-by-side box plot. Charts are SVG files
//! under `<output>/plots/`.

use crate::config::HISTOGRAM_BINS;
use crate::error::{DoctorError, Result};
use crate::profiler::statistics;
use crate::types::DriftPlot;
use crate::utils::numeric_series;
use plotters::prelude::*;
use polars::prelude::*;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const HISTOGRAM_SIZE: (u32, u32) = (800, 500);
const BOXPLOT_SIZE: (u32, u32) = (600, 500);
const BASELINE_COLOR: RGBColor = RGBColor(31, 119, 180);
const NEW_COLOR: RGBColor = RGBColor(255, 127, 14);

/// Produces paired histogram/boxplot artifacts comparing a baseline with
/// the cleaned dataset.
pub trait DriftVisualizer: Send + Sync {
    /// Render artifacts for `columns`. Columns that cannot be rendered are
    /// left out of the returned list.
    fn render(
        &self,
        baseline: &DataFrame,
        cleaned: &DataFrame,
        columns: &[String],
    ) -> Result<Vec<DriftPlot>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramData {
    pub column: String,
    /// `bins + 1` edges shared by both sides.
    pub bin_edges: Vec<f64>,
    pub baseline_counts: Vec<usize>,
    pub new_counts: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumberSummary {
    /// Summary of a numeric Series, `None` when it holds no value.
    pub fn of(values: &Series) -> PolarsResult<Option<Self>> {
        let (Some(min), Some(max)) = (values.min::<f64>()?, values.max::<f64>()?) else {
            return Ok(None);
        };
        let (Some(q1), Some(median), Some(q3)) = (
            statistics::quantile(values, 0.25)?,
            values.median(),
            statistics::quantile(values, 0.75)?,
        ) else {
            return Ok(None);
        };
        Ok(Some(Self {
            min,
            q1,
            median,
            q3,
            max,
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxplotData {
    pub column: String,
    pub baseline: Option<FiveNumberSummary>,
    pub new: Option<FiveNumberSummary>,
}

/// Bin both sides over their combined range.
///
/// A degenerate range is widened by 0.5 on each side so every value lands
/// in a bin.
pub fn shared_histogram(column: &str, baseline: &[f64], new: &[f64], bins: usize) -> HistogramData {
    let bins = bins.max(1);
    let all = baseline.iter().chain(new);
    let mut lo = all.clone().copied().fold(f64::INFINITY, f64::min);
    let mut hi = all.copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        lo = 0.0;
        hi = 1.0;
    } else if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let bin_edges = (0..=bins).map(|i| lo + width * i as f64).collect();
    let count = |values: &[f64]| {
        let mut counts = vec![0usize; bins];
        for v in values {
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }
        counts
    };

    HistogramData {
        column: column.to_string(),
        bin_edges,
        baseline_counts: count(baseline),
        new_counts: count(new),
    }
}

/// Writes `hist_<col>.svg` and `box_<col>.svg` files.
pub struct SvgDriftVisualizer {
    plot_dir: PathBuf,
}

impl SvgDriftVisualizer {
    /// Charts go to `<output_dir>/plots`.
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            plot_dir: output_dir.as_ref().join("plots"),
        }
    }

    pub fn plot_dir(&self) -> &Path {
        &self.plot_dir
    }

    fn render_column(
        &self,
        baseline: &DataFrame,
        cleaned: &DataFrame,
        column: &str,
    ) -> Result<Option<DriftPlot>> {
        let values = |df: &DataFrame| -> Result<Series> {
            let series = df
                .column(column)
                .map_err(|_| DoctorError::ColumnNotFound(column.to_string()))?
                .as_materialized_series();
            Ok(numeric_series(series)
                .unwrap_or_else(|_| Series::new_empty(column.into(), &DataType::Float64)))
        };
        let base = values(baseline)?;
        let new = values(cleaned)?;

        let base_values: Vec<f64> = base.f64()?.into_iter().flatten().collect();
        let new_values: Vec<f64> = new.f64()?.into_iter().flatten().collect();
        if base_values.is_empty() && new_values.is_empty() {
            return Ok(None);
        }

        let stem = file_stem(column);
        let histogram = self.plot_dir.join(format!("hist_{}.svg", stem));
        let boxplot = self.plot_dir.join(format!("box_{}.svg", stem));

        let hist = shared_histogram(column, &base_values, &new_values, HISTOGRAM_BINS);
        draw_histogram(&histogram, &hist)?;

        let summary = BoxplotData {
            column: column.to_string(),
            baseline: FiveNumberSummary::of(&base)?,
            new: FiveNumberSummary::of(&new)?,
        };
        draw_boxplot(&boxplot, &summary)?;

        Ok(Some(DriftPlot {
            column: column.to_string(),
            histogram,
            boxplot,
        }))
    }
}

impl DriftVisualizer for SvgDriftVisualizer {
    fn render(
        &self,
        baseline: &DataFrame,
        cleaned: &DataFrame,
        columns: &[String],
    ) -> Result<Vec<DriftPlot>> {
        fs::create_dir_all(&self.plot_dir)?;

        let mut plots = Vec::new();
        for column in columns {
            match self.render_column(baseline, cleaned, column) {
                Ok(Some(plot)) => plots.push(plot),
                Ok(None) => debug!("Column '{}': no numeric values, no drift plot", column),
                Err(e) => warn!("Column '{}': drift plot failed: {}", column, e),
            }
        }
        Ok(plots)
    }
}

fn plot_error(err: impl Display) -> DoctorError {
    DoctorError::PlotRenderFailed(err.to_string())
}

/// Overlaid baseline/new histogram.
fn draw_histogram(path: &Path, hist: &HistogramData) -> Result<()> {
    let (Some(&lo), Some(&hi)) = (hist.bin_edges.first(), hist.bin_edges.last()) else {
        return Err(plot_error(format!("no bins for '{}'", hist.column)));
    };
    let peak = hist
        .baseline_counts
        .iter()
        .chain(&hist.new_counts)
        .copied()
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let root = SVGBackend::new(path, HISTOGRAM_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Distribution: {}", hist.column), ("sans-serif", 22).into_font())
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(48)
        .build_cartesian_2d(lo..hi, 0.0..peak * 1.1)
        .map_err(plot_error)?;
    chart
        .configure_mesh()
        .x_desc(hist.column.as_str())
        .y_desc("count")
        .draw()
        .map_err(plot_error)?;

    for (label, counts, color) in [
        ("baseline", &hist.baseline_counts, BASELINE_COLOR),
        ("new", &hist.new_counts, NEW_COLOR),
    ] {
        let style = color.mix(0.45).filled();
        chart
            .draw_series(
                counts
                    .iter()
                    .enumerate()
                    .filter(|(_, count)| **count > 0)
                    .map(|(i, &count)| {
                        Rectangle::new(
                            [(hist.bin_edges[i], 0.0), (hist.bin_edges[i + 1], count as f64)],
                            style,
                        )
                    }),
            )
            .map_err(plot_error)?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], style));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;
    root.present().map_err(plot_error)?;
    Ok(())
}

/// Baseline and new box plots side by side. A side with no values is left out.
fn draw_boxplot(path: &Path, data: &BoxplotData) -> Result<()> {
    let sides: Vec<(&str, f64, FiveNumberSummary, RGBColor)> = [
        ("baseline", 0.5, data.baseline, BASELINE_COLOR),
        ("new", 1.5, data.new, NEW_COLOR),
    ]
    .into_iter()
    .filter_map(|(label, center, summary, color)| summary.map(|s| (label, center, s, color)))
    .collect();
    if sides.is_empty() {
        return Err(plot_error(format!("no values for '{}'", data.column)));
    }

    let lo = sides.iter().map(|(_, _, s, _)| s.min).fold(f64::INFINITY, f64::min);
    let hi = sides.iter().map(|(_, _, s, _)| s.max).fold(f64::NEG_INFINITY, f64::max);
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };

    let root = SVGBackend::new(path, BOXPLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Box plot: {}", data.column), ("sans-serif", 22).into_font())
        .margin(12)
        .y_label_area_size(48)
        .build_cartesian_2d(0.0..2.0, (lo - pad)..(hi + pad))
        .map_err(plot_error)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc(data.column.as_str())
        .draw()
        .map_err(plot_error)?;

    for (label, center, s, color) in sides {
        let fill = color.mix(0.45).filled();
        let (left, right) = (center - 0.25, center + 0.25);
        chart
            .draw_series([
                Rectangle::new([(left, s.q1), (right, s.q3)], fill),
                Rectangle::new([(left, s.q1), (right, s.q3)], color.stroke_width(2)),
            ])
            .map_err(plot_error)?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], fill));

        chart
            .draw_series([
                PathElement::new(vec![(left, s.median), (right, s.median)], BLACK.stroke_width(2)),
                PathElement::new(vec![(center, s.min), (center, s.q1)], color.stroke_width(1)),
                PathElement::new(vec![(center, s.q3), (center, s.max)], color.stroke_width(1)),
                PathElement::new(vec![(center - 0.1, s.min), (center + 0.1, s.min)], color.stroke_width(1)),
                PathElement::new(vec![(center - 0.1, s.max), (center + 0.1, s.max)], color.stroke_width(1)),
            ])
            .map_err(plot_error)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;
    root.present().map_err(plot_error)?;
    Ok(())
}

/// File-system safe version of a column name.
fn file_stem(column: &str) -> String {
    column
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shared_histogram_counts_every_value() {
        let hist = shared_histogram("x", &[0.0, 1.0, 2.0, 10.0], &[5.0, 10.0], 10);
        assert_eq!(hist.bin_edges.len(), 11);
        assert_eq!(hist.bin_edges[0], 0.0);
        assert_eq!(hist.bin_edges[10], 10.0);
        assert_eq!(hist.baseline_counts.iter().sum::<usize>(), 4);
        assert_eq!(hist.new_counts.iter().sum::<usize>(), 2);
        // The maximum lands in the last bin.
        assert_eq!(hist.baseline_counts[9], 1);
        assert_eq!(hist.new_counts[5], 1);
    }

    #[test]
    fn test_shared_histogram_constant_values() {
        let hist = shared_histogram("x", &[3.0, 3.0], &[3.0], 4);
        assert_eq!(hist.bin_edges.first(), Some(&2.5));
        assert_eq!(hist.bin_edges.last(), Some(&3.5));
        assert_eq!(hist.baseline_counts.iter().sum::<usize>(), 2);
    }

    #[test]
    fn test_five_number_summary() {
        let values = Series::new("x".into(), &[Some(5.0), None, Some(1.0), Some(3.0), Some(2.0), Some(4.0)]);
        let summary = FiveNumberSummary::of(&values).unwrap().unwrap();
        assert_eq!(
            summary,
            FiveNumberSummary {
                min: 1.0,
                q1: 2.0,
                median: 3.0,
                q3: 4.0,
                max: 5.0
            }
        );

        let empty = Series::new_empty("x".into(), &DataType::Float64);
        assert!(FiveNumberSummary::of(&empty).unwrap().is_none());
    }

    #[test]
    fn test_render_draws_charts_and_skips_bad_columns() {
        let dir = tempfile::tempdir().unwrap();
        let visualizer = SvgDriftVisualizer::new(dir.path());
        let baseline = df![
            "amount" => [1.0, 2.0, 3.0],
            "label" => ["a", "b", "c"],
        ]
        .unwrap();
        let cleaned = df![
            "amount" => [2.0, 3.0, 4.0],
            "label" => ["a", "b", "c"],
        ]
        .unwrap();

        let columns = vec![
            "amount".to_string(),
            "label".to_string(),
            "missing".to_string(),
        ];
        let plots = visualizer.render(&baseline, &cleaned, &columns).unwrap();

        assert_eq!(plots.len(), 1);
        assert_eq!(plots[0].column, "amount");
        assert_eq!(plots[0].histogram, dir.path().join("plots").join("hist_amount.svg"));
        assert_eq!(plots[0].boxplot, dir.path().join("plots").join("box_amount.svg"));

        for path in [&plots[0].histogram, &plots[0].boxplot] {
            let svg = fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"));
            assert!(svg.contains("<rect"));
        }
    }

    #[test]
    fn test_boxplot_with_one_empty_side() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.svg");
        let data = BoxplotData {
            column: "x".to_string(),
            baseline: None,
            new: Some(FiveNumberSummary {
                min: 1.0,
                q1: 1.0,
                median: 1.0,
                q3: 1.0,
                max: 1.0,
            }),
        };
        draw_boxplot(&path, &data).unwrap();
        assert!(path.exists());

        let empty = BoxplotData {
            column: "x".to_string(),
            baseline: None,
            new: None,
        };
        let err = draw_boxplot(&path, &empty).unwrap_err();
        assert_eq!(err.error_code(), "PLOT_RENDER_FAILED");
    }

    #[test]
    fn test_file_stem_sanitizes() {
        assert_eq!(file_stem("unit price/€"), "unit_price__");
        assert_eq!(file_stem("age_2"), "age_2");
    }
}
