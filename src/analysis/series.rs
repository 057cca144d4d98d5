use std::fmt;

// ---------------------------------------------------------------------------
// SeriesKey – one column / slice of a chart
// ---------------------------------------------------------------------------

/// Label of a series. The residual bucket is its own variant so that a
/// real category called "Other" can never be confused with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeriesKey {
    Category(String),
    Residual,
}

pub const RESIDUAL_LABEL: &str = "Other";

impl SeriesKey {
    pub fn category(label: impl Into<String>) -> Self {
        SeriesKey::Category(label.into())
    }

    pub fn is_residual(&self) -> bool {
        matches!(self, SeriesKey::Residual)
    }

    pub fn label(&self) -> &str {
        match self {
            SeriesKey::Category(label) => label,
            SeriesKey::Residual => RESIDUAL_LABEL,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// AggregatedSeries – totals of one population
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesEntry {
    pub key: SeriesKey,
    pub count: u64,
}

/// Ordered category totals; a residual entry, if any, comes last.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregatedSeries {
    pub entries: Vec<SeriesEntry>,
}

impl AggregatedSeries {
    /// Sum over all entries, residual included.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Value of the residual bucket, if present.
    pub fn residual(&self) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.key.is_residual())
            .map(|e| e.count)
    }

    /// Individually listed categories, in order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().filter_map(|e| match &e.key {
            SeriesKey::Category(label) => Some((label.as_str(), e.count)),
            SeriesKey::Residual => None,
        })
    }

    /// Count of a named category.
    pub fn get(&self, label: &str) -> Option<u64> {
        self.categories()
            .find(|(l, _)| *l == label)
            .map(|(_, count)| count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TimeSeriesMatrix – per-period values over a fixed column set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodRow {
    pub period: i32,
    /// One value per matrix column, same order as `columns`.
    pub values: Vec<u64>,
}

/// Periods ascending, every row over the same ordered columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesMatrix {
    pub columns: Vec<SeriesKey>,
    pub rows: Vec<PeriodRow>,
}

impl TimeSeriesMatrix {
    pub fn periods(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.period).collect()
    }

    /// Values of one column across all periods.
    pub fn column(&self, key: &SeriesKey) -> Option<Vec<u64>> {
        let idx = self.columns.iter().position(|c| c == key)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Sum of all columns for each period.
    pub fn period_totals(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.values.iter().sum()).collect()
    }
}

// ---------------------------------------------------------------------------
// TrendSeries – one category over time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendPoint {
    pub period: i32,
    pub total: u64,
    /// Change against the previous point; zero for the first one.
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendSeries {
    pub category: String,
    pub points: Vec<TrendPoint>,
}

impl TrendSeries {
    pub fn deltas(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.delta).collect()
    }
}
