use crate::analysis::aggregate::{category_totals, CategoryAggregator};
use crate::analysis::schema::{ColumnResolver, ResolvedSchema};
use crate::analysis::series::{AggregatedSeries, TimeSeriesMatrix, TrendSeries};
use crate::analysis::stack::SeriesStacker;
use crate::analysis::trend::compute_trend;
use crate::config::AnalysisConfig;
use crate::data::model::{Dataset, Table};
use crate::error::{AnalysisError, AnalysisResult};

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// What the caller asks for on top of the automatic selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Follow a single category over time instead of the whole population.
    pub category: Option<String>,
}

/// Processing mode, chosen once per invocation from the dataset shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// An age column is present.
    Age,
    /// A category filter was requested.
    SingleCategoryTrend(String),
    /// Exactly one period.
    SinglePeriodCategory(i32),
    /// Several periods.
    MultiPeriodCategory,
}

/// The derived values a chart is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    AgeSinglePeriod {
        period: i32,
        bands: AggregatedSeries,
    },
    AgeMultiPeriod {
        matrix: TimeSeriesMatrix,
    },
    CategoryTrend {
        trend: TrendSeries,
    },
    SinglePeriodCategory {
        period: i32,
        series: AggregatedSeries,
    },
    MultiPeriodCategory {
        matrix: TimeSeriesMatrix,
    },
}

// ---------------------------------------------------------------------------
// Mode selection
// ---------------------------------------------------------------------------

impl Mode {
    /// Pick the mode. Precedence: age, category trend, single period,
    /// multiple periods. No valid period at all is an error.
    pub fn select(
        schema: &ResolvedSchema,
        periods: &[i32],
        category_filter: Option<&str>,
    ) -> AnalysisResult<Mode> {
        if periods.is_empty() {
            return Err(AnalysisError::NoValidPeriods {
                column: schema.period.clone(),
            });
        }

        if let Some(age_col) = &schema.age {
            log::info!("Age column '{age_col}' detected, building age structure");
            if let Some(category) = category_filter {
                log::warn!("Category filter '{category}' is ignored for age data");
            }
            return Ok(Mode::Age);
        }
        if let Some(category) = category_filter {
            return Ok(Mode::SingleCategoryTrend(category.to_string()));
        }
        match periods {
            [period] => Ok(Mode::SinglePeriodCategory(*period)),
            _ => Ok(Mode::MultiPeriodCategory),
        }
    }

    /// Run the component behind this mode.
    pub fn run(&self, dataset: &Dataset, config: &AnalysisConfig) -> AnalysisResult<Analysis> {
        match self {
            Mode::Age => run_age(dataset, config),
            Mode::SingleCategoryTrend(category) => {
                let trend = compute_trend(&dataset.records, category)?;
                Ok(Analysis::CategoryTrend { trend })
            }
            Mode::SinglePeriodCategory(period) => {
                let totals = category_totals(&dataset.records);
                if totals.is_empty() {
                    return Err(AnalysisError::EmptyDataset(format!(
                        "no rows with a category in {period}"
                    )));
                }
                if totals.values().sum::<u64>() == 0 {
                    return Err(AnalysisError::EmptyDataset(format!(
                        "all counts in {period} are zero or unreadable"
                    )));
                }
                log::info!("Found {} categories in {period}", totals.len());
                let series = CategoryAggregator::from_config(config).aggregate(&totals);
                Ok(Analysis::SinglePeriodCategory {
                    period: *period,
                    series,
                })
            }
            Mode::MultiPeriodCategory => {
                let matrix = SeriesStacker::from_config(config).stack(&dataset.records)?;
                Ok(Analysis::MultiPeriodCategory { matrix })
            }
        }
    }
}

fn run_age(dataset: &Dataset, config: &AnalysisConfig) -> AnalysisResult<Analysis> {
    let binner = config.age_binner()?;
    let binned = binner.bin_records(&dataset.records);
    if binned.is_empty() {
        return Err(AnalysisError::EmptyDataset(
            "no rows with a usable age".into(),
        ));
    }
    if binned.entries.iter().all(|e| e.count == 0) {
        return Err(AnalysisError::EmptyDataset(
            "all counts of rows with a usable age are zero or unreadable".into(),
        ));
    }

    let periods = binned.periods();
    log::info!("Periods found (age mode): {periods:?}");
    match periods.as_slice() {
        [period] => Ok(Analysis::AgeSinglePeriod {
            period: *period,
            bands: binner.distribution(&binned),
        }),
        _ => Ok(Analysis::AgeMultiPeriod {
            matrix: binner.matrix(&binned),
        }),
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Select and run the mode for an already coerced dataset.
pub fn run(
    dataset: &Dataset,
    config: &AnalysisConfig,
    request: &AnalysisRequest,
) -> AnalysisResult<Analysis> {
    let periods = dataset.periods();
    log::info!("Periods found: {periods:?}");
    let mode = Mode::select(&dataset.schema, &periods, request.category.as_deref())?;
    log::debug!("Selected mode {mode:?}");
    mode.run(dataset, config)
}

/// Resolve the schema of `table`, coerce its rows and run the analysis.
pub fn analyze(
    table: &Table,
    config: &AnalysisConfig,
    request: &AnalysisRequest,
) -> AnalysisResult<Analysis> {
    config.validate()?;
    if table.is_empty() {
        return Err(AnalysisError::EmptyDataset("the table has no rows".into()));
    }
    let resolver = ColumnResolver::new(&config.column_candidates, &table.columns);
    let schema = resolver.resolve_schema(config.category_role)?;
    let dataset = Dataset::from_table(table, schema);
    run(&dataset, config, request)
}
