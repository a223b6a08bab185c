//! Show how the sheet's column labels are normalized, and which configured columns were found.
use clap::Parser;
use coinfection_report::{columns::normalize_columns, header, RawTable, ReportConfig};
use qu::ick_use::*;
use std::{collections::BTreeSet, path::PathBuf};
use term_data_table::{Cell, Row, Table};

#[derive(Parser)]
struct Opt {
    /// A TOML file with report settings.
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// The admissions workbook.
    #[clap(short, long)]
    input: Option<PathBuf>,
    /// The sheet to read (defaults to the year).
    #[clap(short, long)]
    sheet: Option<String>,
    #[clap(short, long)]
    year: Option<i32>,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let mut config = ReportConfig::load_or_default(opt.config.as_deref())?;
    if let Some(input) = opt.input {
        config.input = input;
    }
    if let Some(year) = opt.year {
        config.year = year;
    }
    let sheet = opt.sheet.unwrap_or_else(|| config.sheet_name());
    let raw = RawTable::load(&config.input, &sheet)?;
    let canonical = normalize_columns(&raw.headers);

    header("Columns");
    let mut table = Table::new().with_row(
        Row::new()
            .with_cell(Cell::from("Label in sheet"))
            .with_cell(Cell::from("Column"))
            .with_cell(Cell::from("Non-empty cells")),
    );
    for (idx, (label, column)) in raw.headers.iter().zip(canonical.iter()).enumerate() {
        let filled = raw
            .rows
            .iter()
            .filter(|row| row.get(idx).map(|v| !v.is_missing()).unwrap_or(false))
            .count();
        table.add_row(
            Row::new()
                .with_cell(Cell::from(label.clone()))
                .with_cell(Cell::from(column.clone()))
                .with_cell(Cell::from(format!("{} / {}", filled, raw.rows.len()))),
        );
    }
    println!("{}", table);

    let present: BTreeSet<&str> = canonical.iter().map(|c| &**c).collect();
    let found = |column: &str| if present.contains(column) { "yes" } else { "no" };

    header("Report columns");
    let mut table = Table::new().with_row(
        Row::new()
            .with_cell(Cell::from("Used for"))
            .with_cell(Cell::from("Column"))
            .with_cell(Cell::from("Present")),
    );
    let diagnosis = config
        .diagnosis_columns
        .iter()
        .map(|column| ("diagnosis", column.as_str()));
    for (usage, column) in config.columns.iter().chain(diagnosis) {
        table.add_row(
            Row::new()
                .with_cell(Cell::from(usage))
                .with_cell(Cell::from(column.to_string()))
                .with_cell(Cell::from(found(column))),
        );
    }
    println!("{}", table);

    let searched = config
        .diagnosis_columns
        .iter()
        .filter(|column| present.contains(column.as_str()))
        .count();
    if searched == 0 {
        event!(
            Level::WARN,
            "no diagnosis column found, the report's cohort would be empty"
        );
    }
    Ok(())
}
