// src/cli/preview.rs — Shape, column kinds and the first rows

use std::path::Path;

use crate::dataset::{loader, Dataset};

pub fn preview_text(dataset: &Dataset, rows: usize) -> String {
    let mut out = format!("{} row(s) × {} column(s)\n\n", dataset.len(), dataset.width());
    let name_width = dataset
        .columns()
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0);
    for column in dataset.columns() {
        out.push_str(&format!("  {:<name_width$}  {}\n", column.name, column.kind));
    }
    out.push('\n');
    out.push_str(&dataset.head(rows).to_text_table(rows));
    out
}

pub fn run_preview(csv: &Path, rows: usize) -> anyhow::Result<()> {
    let dataset = loader::load_csv(csv)?;
    println!("{}", preview_text(&dataset, rows));
    Ok(())
}
