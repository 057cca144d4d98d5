use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::analysis::series::{
    AggregatedSeries, SeriesKey, TimeSeriesMatrix, TrendSeries, RESIDUAL_LABEL,
};
use crate::analysis::Analysis;
use crate::color::ColorMap;

const PERSONS_LABEL: &str = "Number of persons";
const YEAR_LABEL: &str = "Year";
const AGE_GROUP_LABEL: &str = "Age group";
const GAIN_COLOR: &str = "#2ca02c";
const LOSS_COLOR: &str = "#d62728";
/// Residual label used when a real category is already called "Other".
const RESIDUAL_RENAMED_LABEL: &str = "Other (remaining)";

// ---------------------------------------------------------------------------
// Chart description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    HorizontalBar,
    Pie,
    Column,
    StackedArea,
    /// Line of totals above a bar chart of changes.
    TrendWithDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub color: String,
    /// Per-point colours for bar and pie charts; empty otherwise.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub point_colors: Vec<String>,
    pub values: Vec<i64>,
}

/// Lower panel of a trend chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaPanel {
    pub title: String,
    pub y_label: String,
    pub values: Vec<i64>,
    pub colors: Vec<String>,
}

/// Everything a renderer needs; no rendering happens here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_title: Option<String>,
    /// Category labels (bar / pie / column) or periods (area / trend).
    pub x_values: Vec<String>,
    pub series: Vec<ChartSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaPanel>,
}

/// Caller-side choices that do not influence the analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartOptions {
    pub title_prefix: String,
    /// Pie instead of horizontal bars for single-period categories.
    pub pie: bool,
    /// Display name of the grouping category, e.g. "Nationality".
    pub category_label: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title_prefix: "Total".to_string(),
            pie: false,
            category_label: "Nationality".to_string(),
        }
    }
}

impl ChartSpec {
    /// Pick the chart type for an analysis result and lay out its data.
    pub fn from_analysis(analysis: &Analysis, options: &ChartOptions) -> Self {
        let prefix = &options.title_prefix;
        let category = &options.category_label;
        match analysis {
            Analysis::SinglePeriodCategory { period, series } => {
                let title = format!("{prefix} – {category} distribution {period}");
                if options.pie {
                    pie(series, title)
                } else {
                    horizontal_bar(series, title, category)
                }
            }
            Analysis::MultiPeriodCategory { matrix } => {
                if options.pie {
                    log::warn!("Pie charts are only drawn for a single year, ignoring");
                }
                stacked_area(
                    matrix,
                    ColorMap::categorical(&matrix.columns),
                    format!("{prefix} – {category} composition"),
                    category,
                )
            }
            Analysis::CategoryTrend { trend } => trend_chart(trend, prefix),
            Analysis::AgeSinglePeriod { period, bands } => {
                let keys: Vec<SeriesKey> = bands.entries.iter().map(|e| e.key.clone()).collect();
                let colors = ColorMap::gradient(&keys);
                ChartSpec {
                    kind: ChartKind::Column,
                    title: format!("{prefix} – Age structure {period}"),
                    x_label: AGE_GROUP_LABEL.to_string(),
                    y_label: PERSONS_LABEL.to_string(),
                    legend_title: None,
                    x_values: keys.iter().map(|k| k.label().to_string()).collect(),
                    series: vec![ChartSeries {
                        label: PERSONS_LABEL.to_string(),
                        color: String::new(),
                        point_colors: keys.iter().map(|k| colors.color_for(k).to_string()).collect(),
                        values: bands.entries.iter().map(|e| e.count as i64).collect(),
                    }],
                    delta: None,
                }
            }
            Analysis::AgeMultiPeriod { matrix } => stacked_area(
                matrix,
                ColorMap::gradient(&matrix.columns),
                format!("{prefix} – Age structure by year"),
                AGE_GROUP_LABEL,
            ),
        }
    }

    /// Human-readable name of the chart type for log output.
    pub fn kind_description(&self) -> &'static str {
        match self.kind {
            ChartKind::HorizontalBar => "horizontal bar chart",
            ChartKind::Pie => "pie chart",
            ChartKind::Column => "column chart",
            ChartKind::StackedArea => "stacked area chart",
            ChartKind::TrendWithDelta => "line chart with yearly change bars",
        }
    }

    /// Write the description as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .context("writing chart description")?;
        Ok(())
    }
}

fn horizontal_bar(series: &AggregatedSeries, title: String, category: &str) -> ChartSpec {
    let keys: Vec<SeriesKey> = series.entries.iter().map(|e| e.key.clone()).collect();
    let colors = ColorMap::categorical(&keys);

    // Bars are listed smallest first so the largest ends up on top.
    let mut entries: Vec<_> = series.entries.iter().collect();
    entries.sort_by_key(|e| e.count);
    let sorted_keys: Vec<SeriesKey> = entries.iter().map(|e| e.key.clone()).collect();

    ChartSpec {
        kind: ChartKind::HorizontalBar,
        title,
        x_label: PERSONS_LABEL.to_string(),
        y_label: category.to_string(),
        legend_title: None,
        x_values: display_labels(&sorted_keys),
        series: vec![ChartSeries {
            label: PERSONS_LABEL.to_string(),
            color: String::new(),
            point_colors: entries
                .iter()
                .map(|e| colors.color_for(&e.key).to_string())
                .collect(),
            values: entries.iter().map(|e| e.count as i64).collect(),
        }],
        delta: None,
    }
}

fn pie(series: &AggregatedSeries, title: String) -> ChartSpec {
    let keys: Vec<SeriesKey> = series.entries.iter().map(|e| e.key.clone()).collect();
    let colors = ColorMap::categorical(&keys);
    ChartSpec {
        kind: ChartKind::Pie,
        title,
        x_label: String::new(),
        y_label: String::new(),
        legend_title: None,
        x_values: display_labels(&keys),
        series: vec![ChartSeries {
            label: PERSONS_LABEL.to_string(),
            color: String::new(),
            point_colors: keys.iter().map(|k| colors.color_for(k).to_string()).collect(),
            values: series.entries.iter().map(|e| e.count as i64).collect(),
        }],
        delta: None,
    }
}

/// Labels for `keys` in order. The residual is renamed when a category
/// already carries its label, so the two never share a legend entry.
fn display_labels(keys: &[SeriesKey]) -> Vec<String> {
    let collides = keys
        .iter()
        .any(|k| !k.is_residual() && k.label() == RESIDUAL_LABEL);
    keys.iter()
        .map(|k| match k {
            SeriesKey::Residual if collides => RESIDUAL_RENAMED_LABEL.to_string(),
            _ => k.label().to_string(),
        })
        .collect()
}

fn stacked_area(
    matrix: &TimeSeriesMatrix,
    colors: ColorMap,
    title: String,
    legend_title: &str,
) -> ChartSpec {
    let labels = display_labels(&matrix.columns);
    let series = matrix
        .columns
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(idx, (key, label))| ChartSeries {
            label,
            color: colors.color_for(key).to_string(),
            point_colors: Vec::new(),
            values: matrix.rows.iter().map(|r| r.values[idx] as i64).collect(),
        })
        .collect();

    ChartSpec {
        kind: ChartKind::StackedArea,
        title,
        x_label: YEAR_LABEL.to_string(),
        y_label: PERSONS_LABEL.to_string(),
        legend_title: Some(legend_title.to_string()),
        x_values: matrix.rows.iter().map(|r| r.period.to_string()).collect(),
        series,
        delta: None,
    }
}

fn trend_chart(trend: &TrendSeries, prefix: &str) -> ChartSpec {
    let category = &trend.category;
    let deltas = trend.deltas();
    ChartSpec {
        kind: ChartKind::TrendWithDelta,
        title: format!("{prefix} – {category}: persons per year"),
        x_label: YEAR_LABEL.to_string(),
        y_label: PERSONS_LABEL.to_string(),
        legend_title: None,
        x_values: trend.points.iter().map(|p| p.period.to_string()).collect(),
        series: vec![ChartSeries {
            label: category.clone(),
            color: crate::color::generate_palette(1).remove(0),
            point_colors: Vec::new(),
            values: trend.points.iter().map(|p| p.total as i64).collect(),
        }],
        delta: Some(DeltaPanel {
            title: format!("Year-over-year change ({category})"),
            y_label: "Change from previous year".to_string(),
            colors: deltas
                .iter()
                .map(|d| {
                    let color = if *d >= 0 { GAIN_COLOR } else { LOSS_COLOR };
                    color.to_string()
                })
                .collect(),
            values: deltas,
        }),
    }
}

// ---------------------------------------------------------------------------
// Titles and output names
// ---------------------------------------------------------------------------

/// Title prefix from the active filters, "Total" when there are none.
pub fn title_prefix(filter_parts: &[String]) -> String {
    if filter_parts.is_empty() {
        "Total".to_string()
    } else {
        filter_parts.join(" – ")
    }
}

/// `<stem>_<filters | total>_<YYYYmmdd_HHMM>.json` next to the input.
pub fn default_output_path(input: &Path, filter_parts: &[String], now: NaiveDateTime) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("chart");
    let extra = if filter_parts.is_empty() {
        "total".to_string()
    } else {
        filter_parts
            .iter()
            .map(|p| p.replace(' ', "_"))
            .collect::<Vec<_>>()
            .join("_")
    };
    input.with_file_name(format!("{stem}_{extra}_{}.json", now.format("%Y%m%d_%H%M")))
}
