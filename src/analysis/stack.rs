use std::collections::BTreeMap;

use crate::analysis::aggregate::{category_totals, rank_by_total};
use crate::analysis::series::{PeriodRow, SeriesKey, TimeSeriesMatrix};
use crate::config::AnalysisConfig;
use crate::data::model::Record;
use crate::error::{AnalysisError, AnalysisResult};

// ---------------------------------------------------------------------------
// Series stacker
// ---------------------------------------------------------------------------

/// Builds the stacked multi-period matrix: a pinned category, the largest
/// remaining categories, and a residual band.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStacker {
    /// Maximum explicit bands, pinned category included.
    pub max_bands: usize,
    pub pinned: Option<String>,
}

impl SeriesStacker {
    pub fn new(max_bands: usize, pinned: Option<String>) -> Self {
        Self { max_bands, pinned }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.max_bands_without_rest,
            config.pinned_category.clone(),
        )
    }

    /// Pick the explicit categories from grand totals over all periods.
    ///
    /// The pinned category comes first when it occurs in the data; the
    /// rest follow by total descending (ties alphabetical) until
    /// `max_bands` categories are selected.
    pub fn select(&self, totals: &BTreeMap<String, u64>) -> Vec<String> {
        let mut selected: Vec<String> = Vec::with_capacity(self.max_bands);
        let pinned = self
            .pinned
            .as_deref()
            .filter(|p| totals.contains_key(*p));

        if let Some(p) = pinned {
            selected.push(p.to_string());
        }
        for (label, _) in rank_by_total(totals) {
            if selected.len() >= self.max_bands {
                break;
            }
            if Some(label) == pinned {
                continue;
            }
            selected.push(label.to_string());
        }
        selected
    }

    /// Build the period × band matrix. Columns: selected categories in
    /// selection order, then the residual.
    pub fn stack(&self, records: &[Record]) -> AnalysisResult<TimeSeriesMatrix> {
        let categorized: Vec<&Record> = records.iter().filter(|r| r.category.is_some()).collect();
        if categorized.is_empty() {
            return Err(AnalysisError::EmptyDataset(
                "no periods with categorized rows to stack".into(),
            ));
        }

        let totals = category_totals(categorized.iter().copied());
        if totals.values().sum::<u64>() == 0 {
            return Err(AnalysisError::EmptyDataset(
                "all counts are zero or unreadable".into(),
            ));
        }
        let selected = self.select(&totals);
        log::info!("Categories shown explicitly: {selected:?}");

        let column_of: BTreeMap<&str, usize> = selected
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), i))
            .collect();
        let residual_col = selected.len();

        let mut rows: BTreeMap<i32, Vec<u64>> = BTreeMap::new();
        for rec in categorized {
            let values = rows
                .entry(rec.period)
                .or_insert_with(|| vec![0; residual_col + 1]);
            let col = rec
                .category
                .as_deref()
                .and_then(|c| column_of.get(c).copied())
                .unwrap_or(residual_col);
            values[col] += rec.count;
        }

        let mut columns: Vec<SeriesKey> = selected.into_iter().map(SeriesKey::Category).collect();
        columns.push(SeriesKey::Residual);

        Ok(TimeSeriesMatrix {
            columns,
            rows: rows
                .into_iter()
                .map(|(period, values)| PeriodRow { period, values })
                .collect(),
        })
    }
}
