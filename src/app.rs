use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};

use popchart::analysis::households::household_shares;
use popchart::analysis::schema::{ColumnResolver, Role};
use popchart::analysis::series::TrendSeries;
use popchart::analysis::Analysis;
use popchart::chart::default_output_path;
use popchart::config::AnalysisConfig;
use popchart::data::filter::{default_tally_path, filter_to_csv, tally};
use popchart::data::loader::{load_file, LoadOptions};
use popchart::plot::{prepare_plot, PlotRequest};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Automatic charts for population statistics exports.
#[derive(Debug, Parser)]
#[command(name = "popchart", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Detect the data shape and write a chart description.
    Plot(PlotArgs),
    /// Copy rows matching one column value into a new CSV.
    Filter(FilterArgs),
    /// Count rows per nationality (or another column).
    Tally(TallyArgs),
    /// Share of one-person households per district.
    Households(HouseholdsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupBy {
    Nationality,
    District,
}

impl From<GroupBy> for Role {
    fn from(by: GroupBy) -> Self {
        match by {
            GroupBy::Nationality => Role::Nationality,
            GroupBy::District => Role::District,
        }
    }
}

#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Input table (.csv, .json or .parquet).
    pub input: PathBuf,
    /// Keep only rows of this district (e.g. "Matthäus").
    #[arg(long)]
    pub district: Option<String>,
    /// Keep only rows of this year.
    #[arg(long)]
    pub year: Option<i32>,
    /// Output file for the chart description.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Pie instead of bars when exactly one year remains.
    #[arg(long)]
    pub pie: bool,
    /// Follow one category over time (e.g. "Ukraine").
    #[arg(long, visible_alias = "nationality")]
    pub category: Option<String>,
    /// Column role used as category.
    #[arg(long, value_enum)]
    pub by: Option<GroupBy>,
    #[arg(long, default_value_t = ';')]
    pub delimiter: char,
    /// JSON file overriding analysis defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    pub input: PathBuf,
    /// Exact column name to filter on.
    pub column: String,
    /// Value the column must equal.
    pub value: String,
    #[arg(long, default_value = "Anzahl")]
    pub count_column: String,
    #[arg(long, default_value_t = ';')]
    pub delimiter: char,
}

#[derive(Debug, Args)]
pub struct TallyArgs {
    pub input: PathBuf,
    /// Report file; defaults to `<stem>_staatsangehoerigkeiten.txt` next to
    /// the input.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Column to count instead of the detected nationality column.
    #[arg(long)]
    pub column: Option<String>,
    #[arg(long, default_value_t = ';')]
    pub delimiter: char,
}

#[derive(Debug, Args)]
pub struct HouseholdsArgs {
    /// Household table (.csv, .json or .parquet).
    pub input: PathBuf,
    /// Only report these districts (repeatable); all when omitted.
    #[arg(long)]
    pub district: Vec<String>,
    #[arg(long, default_value_t = ';')]
    pub delimiter: char,
}

fn load_options(delimiter: char) -> Result<LoadOptions> {
    match u8::try_from(delimiter) {
        Ok(byte) if delimiter.is_ascii() => Ok(LoadOptions { delimiter: byte }),
        _ => bail!("Delimiter must be a single ASCII character, got '{delimiter}'"),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Plot(args) => plot(args),
        Command::Filter(args) => filter(args),
        Command::Tally(args) => tally_command(args),
        Command::Households(args) => households(args),
    }
}

fn plot(args: PlotArgs) -> Result<()> {
    if !args.input.exists() {
        bail!("File not found: {}", args.input.display());
    }

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(by) = args.by {
        config.category_role = by.into();
    }

    let table = load_file(&args.input, &load_options(args.delimiter)?)?;
    let request = PlotRequest {
        district: args.district,
        year: args.year,
        pie: args.pie,
        category: args.category,
    };
    let plot = prepare_plot(table, &config, &request)?;
    if let Analysis::CategoryTrend { trend } = &plot.analysis {
        print_trend(trend);
    }

    let output = args.output.unwrap_or_else(|| {
        default_output_path(&args.input, &plot.filter_parts, Local::now().naive_local())
    });
    plot.spec.write_json(&output)?;

    log::info!("Chart type: {}", plot.spec.kind_description());
    log::info!("Saved as: {}", output.display());
    Ok(())
}

fn print_trend(trend: &TrendSeries) {
    println!("Trend for {}:", trend.category);
    println!("Year | Count | Change from previous year");
    for point in &trend.points {
        println!("{} | {} | {:+}", point.period, point.total, point.delta);
    }
}

fn filter(args: FilterArgs) -> Result<()> {
    let summary = filter_to_csv(
        &args.input,
        &args.column,
        &args.value,
        &args.count_column,
        &load_options(args.delimiter)?,
        Local::now().naive_local(),
    )?;
    println!(
        "{} matching row(s) written to: {}",
        summary.matched_rows,
        summary.output_path.display()
    );
    println!(
        "Total persons (sum of '{}'): {}",
        args.count_column, summary.total_persons
    );
    println!("Entry appended to {}", summary.log_path.display());
    Ok(())
}

fn tally_command(args: TallyArgs) -> Result<()> {
    let table = load_file(&args.input, &load_options(args.delimiter)?)?;
    let column = match &args.column {
        Some(column) => column.clone(),
        None => {
            let config = AnalysisConfig::default();
            ColumnResolver::new(&config.column_candidates, &table.columns)
                .require(Role::Nationality)?
        }
    };

    let result = tally(&table, &column)?;
    let output = args
        .output
        .unwrap_or_else(|| default_tally_path(&args.input, args.column.as_deref()));

    let file =
        File::create(&output).with_context(|| format!("creating {}", output.display()))?;
    let source_name = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let mut writer = BufWriter::new(file);
    result.write_report(source_name, &mut writer)?;
    writer
        .flush()
        .with_context(|| format!("writing {}", output.display()))?;

    println!("Done. Result saved to: {}", output.display());
    Ok(())
}

fn households(args: HouseholdsArgs) -> Result<()> {
    let table = load_file(&args.input, &load_options(args.delimiter)?)?;
    let config = AnalysisConfig::default();
    let shares = household_shares(&table, &config.column_candidates)?;

    for wanted in &args.district {
        if !shares.iter().any(|s| &s.district == wanted) {
            log::warn!("District '{wanted}' not found in {}", args.input.display());
        }
    }

    println!("District | One-person households | Households | Share %");
    for share in shares
        .iter()
        .filter(|s| args.district.is_empty() || args.district.contains(&s.district))
    {
        println!(
            "{} | {} | {} | {:.1}",
            share.district, share.single_person, share.total, share.share_percent
        );
    }
    Ok(())
}
