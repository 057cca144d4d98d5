use std::collections::BTreeSet;
use std::fmt;

use crate::analysis::schema::ResolvedSchema;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the input table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a CSV / JSON / Parquet
/// export can carry. Coercion into the typed record fields happens later,
/// when a schema is known.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Numeric view of the cell. Text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Interpret the cell as a calendar year. Floats are accepted only when
    /// they carry no fractional part (`2023.0`).
    pub fn as_period(&self) -> Option<i32> {
        match self {
            CellValue::Integer(i) => i32::try_from(*i).ok(),
            CellValue::Float(v) => integral_f64(*v).and_then(|i| i32::try_from(i).ok()),
            CellValue::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
                    .and_then(|i| i32::try_from(i).ok())
            }
            _ => None,
        }
    }

    /// Interpret the cell as a person count. Swiss-style thousands
    /// separators (`1'234`, `1 234`) are stripped before parsing.
    /// Negative or fractional values are rejected.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            CellValue::Integer(i) => u64::try_from(*i).ok(),
            CellValue::Float(v) => integral_f64(*v).and_then(|i| u64::try_from(i).ok()),
            CellValue::String(s) => parse_count(s),
            _ => None,
        }
    }

    /// Trimmed text of the cell, `None` for nulls and blank strings.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            CellValue::Null => return None,
            CellValue::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

fn integral_f64(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Parse a count written as text, tolerating thousands separators.
pub fn parse_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '\'' && *c != '’' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<u64>()
        .ok()
        .or_else(|| {
            cleaned
                .parse::<f64>()
                .ok()
                .and_then(integral_f64)
                .and_then(|i| u64::try_from(i).ok())
        })
}

// ---------------------------------------------------------------------------
// Table – the loaded file before any schema is applied
// ---------------------------------------------------------------------------

/// Column names plus typed rows, exactly as the loader produced them.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column names in file order.
    pub columns: Vec<String>,
    /// Rows; every row has exactly `columns.len()` cells.
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table, padding short rows with nulls and cutting long ones.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();
        Table { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by its exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Keep only the rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }
}

// ---------------------------------------------------------------------------
// Record / Dataset – typed rows after schema resolution
// ---------------------------------------------------------------------------

/// One row of population data with its roles coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub period: i32,
    /// Nationality or district, depending on the configured category role.
    pub category: Option<String>,
    pub count: u64,
    pub age: Option<f64>,
    /// Index into the source [`Table`] for passthrough columns.
    pub source_row: usize,
}

/// Records sharing one resolved schema. Every record holds a valid period.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub schema: ResolvedSchema,
    /// Rows dropped because their period could not be coerced.
    pub dropped_rows: usize,
}

impl Dataset {
    /// Coerce the rows of `table` according to `schema`.
    ///
    /// Rows without a valid period are dropped. Counts that cannot be read
    /// contribute zero; uncoercible ages become `None` and are handled by
    /// the age binner.
    pub fn from_table(table: &Table, schema: ResolvedSchema) -> Self {
        let period_idx = table.column_index(&schema.period);
        let count_idx = table.column_index(&schema.count);
        let category_idx = schema
            .category
            .as_deref()
            .and_then(|c| table.column_index(c));
        let age_idx = schema.age.as_deref().and_then(|c| table.column_index(c));

        let mut records = Vec::with_capacity(table.len());
        let mut dropped_rows = 0;
        let mut bad_counts = 0;

        for (row_no, row) in table.rows.iter().enumerate() {
            let Some(period) = period_idx.and_then(|i| row[i].as_period()) else {
                dropped_rows += 1;
                continue;
            };

            let count = match count_idx.map(|i| &row[i]) {
                Some(cell) => cell.as_count().unwrap_or_else(|| {
                    if !cell.is_null() {
                        bad_counts += 1;
                    }
                    0
                }),
                None => 0,
            };

            records.push(Record {
                period,
                category: category_idx.and_then(|i| row[i].as_text()),
                count,
                age: age_idx.and_then(|i| row[i].as_f64()),
                source_row: row_no,
            });
        }

        if dropped_rows > 0 {
            log::warn!(
                "Dropped {dropped_rows} row(s) without a valid value in '{}'",
                schema.period
            );
        }
        if bad_counts > 0 {
            log::warn!(
                "{bad_counts} row(s) had an unreadable value in '{}', counted as 0",
                schema.count
            );
        }

        Dataset {
            records,
            schema,
            dropped_rows,
        }
    }

    /// Distinct periods in ascending order.
    pub fn periods(&self) -> Vec<i32> {
        self.records
            .iter()
            .map(|r| r.period)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record survived coercion.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
