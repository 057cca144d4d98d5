use anyhow::Result;

use crate::analysis::schema::{ColumnResolver, Role};
use crate::analysis::{analyze, Analysis, AnalysisRequest};
use crate::chart::{title_prefix, ChartOptions, ChartSpec};
use crate::config::AnalysisConfig;
use crate::data::filter::{retain_equal, retain_period};
use crate::data::model::Table;
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Plot preparation: filters → analysis → chart description
// ---------------------------------------------------------------------------

/// Row filters and chart choices of one `plot` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotRequest {
    /// Keep only rows of this district.
    pub district: Option<String>,
    /// Keep only rows of this year.
    pub year: Option<i32>,
    pub pie: bool,
    /// Follow one category over time.
    pub category: Option<String>,
}

/// Everything the CLI needs to report and write a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPlot {
    pub analysis: Analysis,
    pub spec: ChartSpec,
    /// Human-readable active filters, e.g. `["District Matthäus", "Year 2023"]`.
    pub filter_parts: Vec<String>,
}

/// Display name of the grouping category.
pub fn category_label(role: Role) -> &'static str {
    match role {
        Role::District => "District",
        _ => "Nationality",
    }
}

/// Apply the district / year filters to `table` and return their
/// descriptions. The district and period columns are only looked up when
/// the matching filter is requested.
pub fn apply_filters(
    table: &mut Table,
    config: &AnalysisConfig,
    request: &PlotRequest,
) -> Result<Vec<String>> {
    let (district_col, period_col) = {
        let resolver = ColumnResolver::new(&config.column_candidates, &table.columns);
        let district_col = match request.district {
            Some(_) => Some(resolver.require(Role::District)?),
            None => None,
        };
        let period_col = match request.year {
            Some(_) => Some(resolver.require(Role::Period)?),
            None => None,
        };
        (district_col, period_col)
    };

    let mut filter_parts = Vec::new();
    if let (Some(district), Some(col)) = (&request.district, &district_col) {
        retain_equal(table, col, district)?;
        filter_parts.push(format!("District {district}"));
    }
    if let (Some(year), Some(col)) = (request.year, &period_col) {
        retain_period(table, col, year)?;
        filter_parts.push(format!("Year {year}"));
    }
    log::debug!("{} row(s) left after filters {filter_parts:?}", table.len());
    Ok(filter_parts)
}

/// Filter `table`, run the analysis and lay out the chart.
///
/// An empty table after filtering is an `EmptyDataset` error rather than
/// an empty chart.
pub fn prepare_plot(
    mut table: Table,
    config: &AnalysisConfig,
    request: &PlotRequest,
) -> Result<PreparedPlot> {
    let filter_parts = apply_filters(&mut table, config, request)?;
    if table.is_empty() {
        return Err(AnalysisError::EmptyDataset("no data left after filtering".into()).into());
    }

    let analysis_request = AnalysisRequest {
        category: request.category.clone(),
    };
    let analysis = analyze(&table, config, &analysis_request)?;

    let options = ChartOptions {
        title_prefix: title_prefix(&filter_parts),
        pie: request.pie,
        category_label: category_label(config.category_role).to_string(),
    };
    let spec = ChartSpec::from_analysis(&analysis, &options);

    Ok(PreparedPlot {
        analysis,
        spec,
        filter_parts,
    })
}
