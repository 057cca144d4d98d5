use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use popchart::analysis::series::SeriesKey;
use popchart::chart::{ChartKind, ChartOptions, ChartSpec};
use popchart::data::filter::retain_equal;
use popchart::data::loader::{load_file, LoadOptions};
use popchart::{analyze, Analysis, AnalysisConfig, AnalysisError, AnalysisRequest};

const NATIONALITIES_CSV: &str = "\u{feff}Jahr;Wohnviertel-Name;Staatsangehoerigkeit;Anzahl\n\
    2021;Matthäus;Schweiz;900\n\
    2021;Matthäus;Deutschland;120\n\
    2021;Matthäus;Italien;60\n\
    2021;Matthäus;Malta;1\n\
    2022;Matthäus;Schweiz;880\n\
    2022;Matthäus;Deutschland;130\n\
    2022;Matthäus;Ukraine;45\n\
    2023;Matthäus;Schweiz;870\n\
    2023;Matthäus;Ukraine;30\n\
    2023;Bruderholz;Schweiz;2000\n\
    unbekannt;Bruderholz;Schweiz;5\n";

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn multi_year_csv_becomes_stacked_area() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "100126.csv", NATIONALITIES_CSV);

    let mut table = load_file(&path, &LoadOptions::default()).unwrap();
    retain_equal(&mut table, "Wohnviertel-Name", "Matthäus").unwrap();

    let config = AnalysisConfig {
        max_bands_without_rest: 3,
        ..AnalysisConfig::default()
    };
    let analysis = analyze(&table, &config, &AnalysisRequest::default()).unwrap();
    let Analysis::MultiPeriodCategory { matrix } = &analysis else {
        panic!("unexpected analysis {analysis:?}");
    };

    // Ukraine (75 over all years) outranks Italien (60).
    assert_eq!(
        matrix.columns,
        vec![
            SeriesKey::category("Schweiz"),
            SeriesKey::category("Deutschland"),
            SeriesKey::category("Ukraine"),
            SeriesKey::Residual,
        ]
    );
    assert_eq!(matrix.periods(), vec![2021, 2022, 2023]);
    assert_eq!(matrix.period_totals(), vec![1081, 1055, 900]);
    assert_eq!(matrix.column(&SeriesKey::Residual), Some(vec![61, 0, 0]));

    let spec = ChartSpec::from_analysis(&analysis, &ChartOptions::default());
    let out = dir.path().join("chart.json");
    spec.write_json(&out).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["kind"], "stacked_area");
    assert_eq!(json["series"][0]["label"], "Schweiz");
    assert_eq!(json["series"][3]["label"], "Other");
    assert_eq!(json["x_values"][2], "2023");
}

#[test]
fn single_year_with_threshold_folds_the_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "2021.csv", NATIONALITIES_CSV);

    let mut table = load_file(&path, &LoadOptions::default()).unwrap();
    popchart::data::filter::retain_period(&mut table, "Jahr", 2021).unwrap();

    let config = AnalysisConfig {
        min_share_for_own_category: 0.06,
        ..AnalysisConfig::default()
    };
    let analysis = analyze(&table, &config, &AnalysisRequest::default()).unwrap();
    let Analysis::SinglePeriodCategory { period, series } = &analysis else {
        panic!("unexpected analysis {analysis:?}");
    };
    assert_eq!(*period, 2021);
    assert_eq!(series.get("Schweiz"), Some(900));
    assert_eq!(series.get("Deutschland"), Some(120));
    assert_eq!(series.residual(), Some(61));
    assert_eq!(series.total(), 1081);

    let options = ChartOptions {
        pie: true,
        ..ChartOptions::default()
    };
    let spec = ChartSpec::from_analysis(&analysis, &options);
    assert_eq!(spec.kind, ChartKind::Pie);
}

#[test]
fn trend_request_reports_deltas() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "trend.csv", NATIONALITIES_CSV);
    let table = load_file(&path, &LoadOptions::default()).unwrap();

    let request = AnalysisRequest {
        category: Some("Ukraine".into()),
    };
    let analysis = analyze(&table, &AnalysisConfig::default(), &request).unwrap();
    let Analysis::CategoryTrend { trend } = analysis else {
        panic!("unexpected analysis {analysis:?}");
    };
    assert_eq!(trend.deltas(), vec![0, -15]);

    let request = AnalysisRequest {
        category: Some("Mars".into()),
    };
    let err = analyze(&table, &AnalysisConfig::default(), &request).unwrap_err();
    assert_eq!(err, AnalysisError::NoMatchingCategory("Mars".into()));
}

#[test]
fn header_drift_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "drift.csv", "Year;Anzahl;Alter\n2023;4;10\n");
    let table = load_file(&path, &LoadOptions::default()).unwrap();

    let err = analyze(&table, &AnalysisConfig::default(), &AnalysisRequest::default())
        .unwrap_err();
    let AnalysisError::SchemaMismatch {
        candidates,
        present,
        ..
    } = err
    else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(candidates, vec!["Jahr", "jahr"]);
    assert_eq!(present, vec!["Year", "Anzahl", "Alter"]);
}

#[test]
fn json_age_table_becomes_age_matrix() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "ages.json",
        r#"[
            {"Jahr": 2022, "Alter": 3, "Anzahl": 10},
            {"Jahr": 2022, "Alter": 40, "Anzahl": 20},
            {"Jahr": 2023, "Alter": 3, "Anzahl": 12},
            {"Jahr": 2023, "Alter": "?", "Anzahl": 99}
        ]"#,
    );
    let table = load_file(&path, &LoadOptions::default()).unwrap();
    let analysis =
        analyze(&table, &AnalysisConfig::default(), &AnalysisRequest::default()).unwrap();
    let Analysis::AgeMultiPeriod { matrix } = &analysis else {
        panic!("unexpected analysis {analysis:?}");
    };
    assert_eq!(
        matrix.columns,
        vec![SeriesKey::category("0–5"), SeriesKey::category("35–44")]
    );
    assert_eq!(matrix.period_totals(), vec![30, 12]);

    let spec = ChartSpec::from_analysis(&analysis, &ChartOptions::default());
    assert_eq!(spec.kind, ChartKind::StackedArea);
    assert_eq!(spec.legend_title.as_deref(), Some("Age group"));
}

#[test]
fn parquet_input_is_supported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("population.parquet");

    let schema = Arc::new(Schema::new(vec![
        Field::new("jahr", DataType::Int64, false),
        Field::new("staatsangehoerigkeit", DataType::Utf8, true),
        Field::new("anzahl", DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![2024, 2024, 2024])),
        Arc::new(StringArray::from(vec![Some("Schweiz"), Some("Italien"), None])),
        Arc::new(Float64Array::from(vec![80.0, 20.0, 7.0])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let table = load_file(&path, &LoadOptions::default()).unwrap();
    let analysis =
        analyze(&table, &AnalysisConfig::default(), &AnalysisRequest::default()).unwrap();
    let Analysis::SinglePeriodCategory { series, .. } = analysis else {
        panic!("unexpected analysis {analysis:?}");
    };
    assert_eq!(series.get("Schweiz"), Some(80));
    assert_eq!(series.get("Italien"), Some(20));
    assert_eq!(series.residual(), None);
}

#[test]
fn household_csv_gives_one_person_shares() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "haushalte_2024.csv",
        "Wohnviertel;hh_1_person;hh_total\n\
         Matthäus;4'200;8'400\n\
         Bruderholz;900;3600\n\
         Total;;\n",
    );
    let table = load_file(&path, &LoadOptions::default()).unwrap();
    let shares = popchart::analysis::households::household_shares(
        &table,
        &AnalysisConfig::default().column_candidates,
    )
    .unwrap();

    assert_eq!(shares.len(), 2);
    assert_eq!(shares[0].district, "Matthäus");
    assert_eq!(shares[0].total, 8400);
    assert!((shares[0].share_percent - 50.0).abs() < 1e-9);
    assert!((shares[1].share_percent - 25.0).abs() < 1e-9);
}
