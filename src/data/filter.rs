use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, WriterBuilder};

use super::loader::{decode_text, LoadOptions};
use super::model::{parse_count, Table};

// ---------------------------------------------------------------------------
// In-memory row filters
// ---------------------------------------------------------------------------

fn column_or_bail(table: &Table, column: &str) -> Result<usize> {
    match table.column_index(column) {
        Some(idx) => Ok(idx),
        None => bail!(
            "Column '{column}' not found. Available columns: {:?}",
            table.columns
        ),
    }
}

/// Keep rows whose trimmed cell text equals `value`.
pub fn retain_equal(table: &mut Table, column: &str, value: &str) -> Result<()> {
    let idx = column_or_bail(table, column)?;
    table.retain_rows(|row| row[idx].as_text().as_deref() == Some(value));
    Ok(())
}

/// Keep rows whose period coerces to `year`.
pub fn retain_period(table: &mut Table, column: &str, year: i32) -> Result<()> {
    let idx = column_or_bail(table, column)?;
    table.retain_rows(|row| row[idx].as_period() == Some(year));
    Ok(())
}

// ---------------------------------------------------------------------------
// File filter: matching rows to a new CSV plus a running log
// ---------------------------------------------------------------------------

/// Name of the log file written next to the input.
pub const FILTER_LOG_NAME: &str = "Anzahl.txt";

/// Outcome of [`filter_to_csv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSummary {
    pub output_path: PathBuf,
    pub log_path: PathBuf,
    pub matched_rows: usize,
    /// Sum of the count column over the matched rows.
    pub total_persons: u64,
}

/// Copy the rows of `input` whose `column` equals `value` into
/// `<stem>_<column>_<value><HHMM>.csv` and append a line to
/// [`FILTER_LOG_NAME`]. Unreadable counts add zero.
pub fn filter_to_csv(
    input: &Path,
    column: &str,
    value: &str,
    count_column: &str,
    options: &LoadOptions,
    now: NaiveDateTime,
) -> Result<FilterSummary> {
    let bytes =
        std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let text = decode_text(&bytes);

    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers().context("reading CSV headers")?.clone();

    let Some(filter_idx) = headers.iter().position(|h| h == column) else {
        bail!("Column '{column}' not found. Available columns: {headers:?}");
    };
    let Some(count_idx) = headers.iter().position(|h| h == count_column) else {
        bail!("Count column '{count_column}' not found. Available columns: {headers:?}");
    };

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("filtered");
    let output_name = format!(
        "{stem}_{}_{}{}.csv",
        column.replace(' ', "_"),
        value.replace(' ', "_"),
        now.format("%H%M")
    );
    let output_path = input.with_file_name(output_name);
    let log_path = input.with_file_name(FILTER_LOG_NAME);

    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_path(&output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;
    writer.write_record(&headers)?;

    let mut matched_rows = 0;
    let mut total_persons = 0u64;
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {}", row_no + 1))?;
        if record.get(filter_idx).unwrap_or("").trim() != value {
            continue;
        }
        writer.write_record(&record)?;
        matched_rows += 1;
        total_persons += record.get(count_idx).and_then(parse_count).unwrap_or(0);
    }
    writer.flush()?;

    let mut log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;
    writeln!(
        log_file,
        "{} | Datei={} | Filterspalte={column} | Wert={value} | Personen={total_persons}",
        now.format("%Y-%m-%d %H:%M"),
        input.file_name().and_then(|n| n.to_str()).unwrap_or_default(),
    )?;

    Ok(FilterSummary {
        output_path,
        log_path,
        matched_rows,
        total_persons,
    })
}

// ---------------------------------------------------------------------------
// Tally: how many rows carry each category value
// ---------------------------------------------------------------------------

/// Row count per distinct non-empty value of one column, alphabetical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub column: String,
    pub counts: BTreeMap<String, usize>,
}

impl Tally {
    /// Rows that had a value in the column.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Tab-separated text report.
    pub fn write_report<W: Write>(&self, source_name: &str, mut out: W) -> std::io::Result<()> {
        writeln!(out, "Tally of '{}' for file: {source_name}", self.column)?;
        writeln!(out, "Rows with a value: {}", self.total())?;
        writeln!(out)?;
        writeln!(out, "{}\tRows", self.column)?;
        writeln!(out, "{}", "-".repeat(40))?;
        for (value, count) in &self.counts {
            writeln!(out, "{value}\t{count}")?;
        }
        Ok(())
    }
}

/// Default report path next to `input`: `<stem>_staatsangehoerigkeiten.txt`
/// for the nationality column, `<stem>_<column>.txt` for an explicit one.
pub fn default_tally_path(input: &Path, column: Option<&str>) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tally");
    let suffix = match column {
        Some(column) => column.to_lowercase().replace(' ', "_"),
        None => "staatsangehoerigkeiten".to_string(),
    };
    input.with_file_name(format!("{stem}_{suffix}.txt"))
}

/// Count rows per value of `column`; blank cells are skipped.
pub fn tally(table: &Table, column: &str) -> Result<Tally> {
    let idx = column_or_bail(table, column)?;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in &table.rows {
        if let Some(value) = row[idx].as_text() {
            *counts.entry(value).or_default() += 1;
        }
    }
    Ok(Tally {
        column: column.to_string(),
        counts,
    })
}
