// tests/explore_test.rs — Integration test: CSV on disk through the manual explorer

use std::io::Write;

use datascribe::cli::explore::{explore, ExploreOptions};
use datascribe::cli::render::format_figure;
use datascribe::dataset::aggregate::Aggregation;
use datascribe::dataset::loader::load_csv;
use datascribe::dataset::ColumnKind;
use datascribe::infra::config::DisplayConfig;
use datascribe::infra::errors::DataScribeError;
use datascribe::viz::{ChartKind, LabelMode, Layer};

fn write_csv(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_sanitizes_headers_and_types_columns() {
    let file = write_csv(
        "\u{feff}Order Date,Unit-Price,in stock,Region\n\
         2023-01-01,9.5,true,east\n\
         2023-01-02,,false,west\n",
    );
    let dataset = load_csv(file.path()).unwrap();

    assert_eq!(
        dataset.column_names(),
        vec!["Order_Date", "Unit_Price", "in_stock", "Region"]
    );
    let kinds: Vec<ColumnKind> = dataset.columns().iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ColumnKind::Temporal,
            ColumnKind::Numeric,
            ColumnKind::Boolean,
            ColumnKind::Categorical,
        ]
    );
    assert!(dataset.rows()[1][1].is_null());
}

#[test]
fn test_load_rejects_bad_files() {
    let header_only = write_csv("a,b\n");
    assert!(matches!(
        load_csv(header_only.path()),
        Err(DataScribeError::EmptyDataset)
    ));

    let ragged = write_csv("a,b\n1,2\n3\n");
    assert!(matches!(
        load_csv(ragged.path()),
        Err(DataScribeError::MalformedCsv(_))
    ));
}

#[test]
fn test_bar_chart_renders_in_terminal() {
    let file = write_csv(
        "region,sales\n\
         east,100\n\
         west,50\n\
         east,100\n",
    );
    let dataset = load_csv(file.path()).unwrap();
    let mut opts = ExploreOptions::new(ChartKind::Bar);
    opts.x = Some("region".into());
    opts.y = Some("sales".into());
    opts.agg = Aggregation::Sum;

    let figure = explore(&dataset, &opts).unwrap();
    assert_eq!(
        figure.layers,
        vec![Layer::Bar {
            labels: vec!["east".into(), "west".into()],
            values: vec![200.0, 50.0],
        }]
    );

    let text = format_figure(&figure, &DisplayConfig::default());
    assert!(text.contains("east"));
    assert!(text.contains("200"));
    assert!(text.contains('█'));
}

#[test]
fn test_date_filter_and_correlation() {
    let file = write_csv(
        "date,sales,visitors\n\
         2023-01-01,100,10\n\
         2023-02-01,200,20\n\
         2023-03-01,300,30\n\
         2023-04-01,50,40\n",
    );
    let dataset = load_csv(file.path()).unwrap();
    let mut opts = ExploreOptions::new(ChartKind::Correlation);
    opts.filters = vec!["date=2023-01-01..2023-03-31".into()];

    let figure = explore(&dataset, &opts).unwrap();
    match &figure.layers[0] {
        Layer::Heatmap {
            x_labels, cells, ..
        } => {
            assert_eq!(x_labels, &vec!["sales".to_string(), "visitors".to_string()]);
            let r = cells[0][1].unwrap();
            assert!((r - 1.0).abs() < 1e-9, "perfect correlation expected, got {r}");
        }
        other => panic!("expected a heatmap, got {other:?}"),
    }
}

#[test]
fn test_thin_labels_keep_first() {
    let rows: String = (0..30).map(|i| format!("k{i:02},{i}\n")).collect();
    let file = write_csv(&format!("key,value\n{rows}"));
    let dataset = load_csv(file.path()).unwrap();
    let mut opts = ExploreOptions::new(ChartKind::Bar);
    opts.x = Some("key".into());
    opts.y = Some("value".into());

    let figure = explore(&dataset, &opts).unwrap();
    let display = DisplayConfig {
        label_mode: LabelMode::Thin,
        ..DisplayConfig::default()
    };
    let text = format_figure(&figure, &display);
    assert!(text.contains("k00"));
}
