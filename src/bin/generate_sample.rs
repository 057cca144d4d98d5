use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Writes deterministic synthetic population data as CSV or Parquet.
#[derive(Debug, Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Output path; `.parquet` writes Parquet, anything else `;`-CSV.
    #[arg(default_value = "sample_population.csv")]
    output: PathBuf,
    /// One row per age instead of per nationality.
    #[arg(long)]
    with_age: bool,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const YEARS: std::ops::RangeInclusive<i64> = 2015..=2024;

const DISTRICTS: [&str; 5] = [
    "Altstadt Grossbasel",
    "Matthäus",
    "Bruderholz",
    "Gundeldingen",
    "Riehen",
];

/// Nationality with its rough base population per district.
const NATIONALITIES: [(&str, f64); 14] = [
    ("Schweiz", 9000.0),
    ("Deutschland", 1400.0),
    ("Italien", 700.0),
    ("Türkei", 450.0),
    ("Portugal", 260.0),
    ("Spanien", 240.0),
    ("Frankreich", 220.0),
    ("Kosovo", 180.0),
    ("Ukraine", 60.0),
    ("Indien", 55.0),
    ("Sri Lanka", 40.0),
    ("Eritrea", 30.0),
    ("Malta", 3.0),
    ("Island", 2.0),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Multiplicative noise around 1.0 (±`spread`).
    fn jitter(&mut self, spread: f64) -> f64 {
        1.0 + (self.next_f64() * 2.0 - 1.0) * spread
    }
}

/// Population rows in column order; `age` is empty without `--with-age`.
#[derive(Default)]
struct Columns {
    year: Vec<i64>,
    district: Vec<String>,
    nationality: Vec<String>,
    age: Vec<i64>,
    count: Vec<i64>,
}

fn generate(rng: &mut SimpleRng, with_age: bool) -> Columns {
    let mut cols = Columns::default();
    for year in YEARS {
        let growth = 1.0 + (year - YEARS.start()) as f64 * 0.01;
        for district in DISTRICTS {
            let district_scale = rng.jitter(0.4);
            if with_age {
                for age in 0..=104i64 {
                    let shape = if age < 65 {
                        120.0
                    } else {
                        120.0 * (-(age - 65) as f64 / 12.0).exp()
                    };
                    let count = (shape * district_scale * growth * rng.jitter(0.2)).round() as i64;
                    cols.year.push(year);
                    cols.district.push(district.to_string());
                    cols.nationality.push(String::new());
                    cols.age.push(age);
                    cols.count.push(count.max(0));
                }
                continue;
            }
            for (nationality, base) in NATIONALITIES {
                // Ukrainian population jumps from 2022 on.
                let surge = if nationality == "Ukraine" && year >= 2022 { 8.0 } else { 1.0 };
                let count =
                    (base * district_scale * growth * surge * rng.jitter(0.1)).round() as i64;
                cols.year.push(year);
                cols.district.push(district.to_string());
                cols.nationality.push(nationality.to_string());
                cols.count.push(count.max(0));
            }
        }
    }
    cols
}

fn write_csv(path: &Path, cols: &Columns, with_age: bool) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    if with_age {
        writer.write_record(["Jahr", "Wohnviertel-Name", "Alter", "Anzahl"])?;
    } else {
        writer.write_record(["Jahr", "Wohnviertel-Name", "Staatsangehoerigkeit", "Anzahl"])?;
    }
    for i in 0..cols.year.len() {
        let middle = if with_age {
            cols.age[i].to_string()
        } else {
            cols.nationality[i].clone()
        };
        writer.write_record([
            cols.year[i].to_string(),
            cols.district[i].clone(),
            middle,
            cols.count[i].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, cols: Columns, with_age: bool) -> Result<()> {
    let mut fields = vec![
        Field::new("Jahr", DataType::Int64, false),
        Field::new("Wohnviertel-Name", DataType::Utf8, false),
    ];
    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(cols.year)),
        Arc::new(StringArray::from(cols.district)),
    ];
    if with_age {
        fields.push(Field::new("Alter", DataType::Int64, false));
        arrays.push(Arc::new(Int64Array::from(cols.age)));
    } else {
        fields.push(Field::new("Staatsangehoerigkeit", DataType::Utf8, false));
        arrays.push(Arc::new(StringArray::from(cols.nationality)));
    }
    fields.push(Field::new("Anzahl", DataType::Int64, false));
    arrays.push(Arc::new(Int64Array::from(cols.count)));

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    let cols = generate(&mut rng, args.with_age);
    let n_rows = cols.year.len();

    let is_parquet = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        write_parquet(&args.output, cols, args.with_age)?;
    } else {
        write_csv(&args.output, &cols, args.with_age)?;
    }

    println!("Wrote {n_rows} rows to {}", args.output.display());
    Ok(())
}
