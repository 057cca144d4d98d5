use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use arrow::util::display::array_value_to_string;
use csv::{ReaderBuilder, Trim};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Knobs for text formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Field delimiter for CSV input. Swiss open data uses `;`.
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b';' }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a population table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – delimited text with a header row
/// * `.json`         – `[{ "Jahr": 2023, "Anzahl": 12, ... }, ...]`
/// * `.parquet`      – flat scalar columns
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" | "txt" => load_csv(path, options)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    log::info!(
        "Loaded {} rows with columns {:?} from {}",
        table.len(),
        table.columns,
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, options: &LoadOptions) -> Result<Table> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading CSV file {}", path.display()))?;
    parse_csv(&bytes, options)
}

/// Parse delimited text. A UTF-8 byte order mark is dropped; input that is
/// not valid UTF-8 is decoded as Windows-1252.
pub fn parse_csv(bytes: &[u8], options: &LoadOptions) -> Result<Table> {
    let text = decode_text(bytes);

    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {}", row_no + 1))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(Table::new(columns, rows))
}

pub(crate) fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            log::warn!("Input is not valid UTF-8, decoding as Windows-1252");
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text
        }
    }
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Jahr": 2023, "Staatsangehoerigkeit": "Schweiz", "Anzahl": 1200 },
///   ...
/// ]
/// ```
///
/// Columns are the union of keys over all records.
/// Records that are not objects are rejected.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

pub fn parse_json(text: &str) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(Table::new(columns, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_cell(col, row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            rows.push(cells);
        }
    }

    Ok(Table::new(columns, rows))
}

// -- Parquet / Arrow helpers --

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let any = col.as_any();
    let cell = match col.data_type() {
        DataType::Utf8 => match any.downcast_ref::<StringArray>() {
            Some(s) => CellValue::String(s.value(row).to_string()),
            None => bail!("expected StringArray"),
        },
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => match any.downcast_ref::<Int32Array>() {
            Some(arr) => CellValue::Integer(arr.value(row) as i64),
            None => bail!("expected Int32Array"),
        },
        DataType::Int64 => match any.downcast_ref::<Int64Array>() {
            Some(arr) => CellValue::Integer(arr.value(row)),
            None => bail!("expected Int64Array"),
        },
        DataType::Float32 => match any.downcast_ref::<Float32Array>() {
            Some(arr) => CellValue::Float(arr.value(row) as f64),
            None => bail!("expected Float32Array"),
        },
        DataType::Float64 => match any.downcast_ref::<Float64Array>() {
            Some(arr) => CellValue::Float(arr.value(row)),
            None => bail!("expected Float64Array"),
        },
        DataType::Boolean => match any.downcast_ref::<BooleanArray>() {
            Some(arr) => CellValue::Bool(arr.value(row)),
            None => bail!("expected BooleanArray"),
        },
        _ => guess_cell_type(
            &array_value_to_string(col, row).context("formatting parquet value")?,
        ),
    };
    Ok(cell)
}
