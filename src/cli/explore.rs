// src/cli/explore.rs — Manual charting: filters, aggregation, chart type

use std::path::Path;

use super::progress::{self, Stage};
use super::render::format_figure;
use crate::dataset::aggregate::Aggregation;
use crate::dataset::filter::{self, Filter};
use crate::dataset::{loader, Dataset};
use crate::infra::config::{Config, DisplayConfig};
use crate::infra::errors::DataScribeError;
use crate::viz::builder::{build_figure, ChartSpec};
use crate::viz::{ChartKind, Figure, LabelMode};

#[derive(Debug, Clone)]
pub struct ExploreOptions {
    pub chart: ChartKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub agg: Aggregation,
    pub series: Option<String>,
    pub series_values: Vec<String>,
    pub filters: Vec<String>,
}

impl ExploreOptions {
    pub fn new(chart: ChartKind) -> Self {
        Self {
            chart,
            x: None,
            y: None,
            agg: Aggregation::None,
            series: None,
            series_values: Vec::new(),
            filters: Vec::new(),
        }
    }

    fn chart_spec(&self) -> ChartSpec {
        let mut spec = ChartSpec::new(self.chart).aggregate(self.agg);
        spec.x = self.x.clone();
        spec.y = self.y.clone();
        spec.series_by = self
            .series
            .as_ref()
            .map(|column| (column.clone(), self.series_values.clone()));
        spec
    }
}

/// Filter the dataset, then build the requested figure.
pub fn explore(dataset: &Dataset, opts: &ExploreOptions) -> Result<Figure, DataScribeError> {
    let filters = opts
        .filters
        .iter()
        .map(|spec| Filter::parse(spec, dataset))
        .collect::<Result<Vec<_>, _>>()?;
    let filtered = filter::apply_all(dataset, &filters)?;
    if filtered.is_empty() {
        return Err(DataScribeError::EmptyDataset);
    }
    build_figure(&filtered, &opts.chart_spec())
}

pub fn run_explore(
    config: &Config,
    csv: &Path,
    opts: &ExploreOptions,
    labels: Option<LabelMode>,
) -> anyhow::Result<()> {
    let dataset = loader::load_csv(csv)?;
    progress::report(Stage::Loaded {
        rows: dataset.len(),
        columns: dataset.width(),
    });

    let display = DisplayConfig {
        label_mode: labels.unwrap_or(config.display.label_mode),
        ..config.display.clone()
    };
    match explore(&dataset, opts) {
        Ok(figure) => println!("{}", format_figure(&figure, &display)),
        Err(e) => progress::report(Stage::Failed(&e)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::loader::load_csv_reader;
    use crate::viz::Layer;

    fn sales() -> Dataset {
        load_csv_reader(
            "date,region,sales\n\
             2023-01-01,east,100\n\
             2023-01-01,west,50\n\
             2023-01-02,east,150\n\
             2023-01-02,west,200\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_bar_with_sum() {
        let mut opts = ExploreOptions::new(ChartKind::Bar);
        opts.x = Some("region".into());
        opts.y = Some("sales".into());
        opts.agg = Aggregation::Sum;

        let figure = explore(&sales(), &opts).unwrap();
        match &figure.layers[0] {
            Layer::Bar { labels, values } => {
                assert_eq!(labels, &vec!["east".to_string(), "west".to_string()]);
                assert_eq!(values, &vec![250.0, 250.0]);
            }
            other => panic!("expected bars, got {other:?}"),
        }
    }

    #[test]
    fn test_filters_apply_before_chart() {
        let mut opts = ExploreOptions::new(ChartKind::Bar);
        opts.x = Some("region".into());
        opts.y = Some("sales".into());
        opts.agg = Aggregation::Sum;
        opts.filters = vec!["sales=100..".into()];

        let figure = explore(&sales(), &opts).unwrap();
        match &figure.layers[0] {
            Layer::Bar { values, .. } => assert_eq!(values, &vec![250.0, 200.0]),
            other => panic!("expected bars, got {other:?}"),
        }
    }

    #[test]
    fn test_filter_removing_everything_is_an_error() {
        let mut opts = ExploreOptions::new(ChartKind::Correlation);
        opts.filters = vec!["sales=1000..".into()];
        assert!(matches!(
            explore(&sales(), &opts),
            Err(DataScribeError::EmptyDataset)
        ));
    }

    #[test]
    fn test_time_series_per_region() {
        let mut opts = ExploreOptions::new(ChartKind::TimeSeries);
        opts.y = Some("sales".into());
        opts.series = Some("region".into());
        opts.series_values = vec!["west".into()];

        let figure = explore(&sales(), &opts).unwrap();
        assert_eq!(figure.layers.len(), 1);
        match &figure.layers[0] {
            Layer::Line { name, values, .. } => {
                assert_eq!(name.as_deref(), Some("west"));
                assert_eq!(values, &vec![50.0, 200.0]);
            }
            other => panic!("expected a line, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_axis_is_reported() {
        let opts = ExploreOptions::new(ChartKind::Scatter);
        assert!(explore(&sales(), &opts).is_err());
    }
}
