//! Read one sheet of a workbook into memory.
use crate::{check_extension, Result, Value};
use anyhow::Context;
use calamine::{open_workbook_auto, DataType, Reader};
use qu::ick_use::*;
use std::path::Path;

/// Workbook formats calamine can open.
pub const EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// A sheet as found: the first row as labels, every following non-empty row as values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    /// Load `sheet` from the workbook at `path`.
    ///
    /// If there is no sheet with that name the first sheet is used instead, with a warning. A
    /// missing or unreadable file is an error.
    pub fn load(path: impl AsRef<Path>, sheet: &str) -> Result<Self> {
        fn inner(path: &Path, sheet: &str) -> Result<RawTable> {
            check_extension(path, EXTENSIONS)?;
            let mut workbook = open_workbook_auto(path)?;
            let range = match workbook.worksheet_range(sheet) {
                Some(range) => range?,
                None => {
                    let first = workbook
                        .sheet_names()
                        .first()
                        .cloned()
                        .context("workbook has no sheets")?;
                    event!(
                        Level::WARN,
                        "no sheet named \"{}\", reading \"{}\" instead",
                        sheet,
                        first
                    );
                    workbook
                        .worksheet_range(&first)
                        .with_context(|| format!("missing `{}` worksheet", first))??
                }
            };
            let table = RawTable::from_range(&range);
            event!(
                Level::INFO,
                "read {} rows and {} columns",
                table.rows.len(),
                table.headers.len()
            );
            Ok(table)
        }
        let path = path.as_ref();
        inner(path, sheet)
            .with_context(|| format!("unable to read sheet \"{}\" from \"{}\"", sheet, path.display()))
    }

    /// Split a calamine range into headers and rows. Rows with no values at all are dropped.
    pub fn from_range(range: &calamine::Range<DataType>) -> Self {
        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|row| row.iter().map(header_label).collect())
            .unwrap_or_default();
        let rows = rows
            .map(|row| row.iter().map(cell_value).collect::<Vec<_>>())
            .filter(|row| !row.iter().all(Value::is_missing))
            .collect();
        RawTable { headers, rows }
    }
}

fn header_label(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(s) => s.trim().to_owned(),
        other => other.to_string(),
    }
}

/// Convert one cell.
///
/// Spreadsheet dates become dates. Everything we can't represent becomes text.
pub fn cell_value(cell: &DataType) -> Value {
    match cell {
        DataType::Empty | DataType::Error(_) => Value::Missing,
        DataType::String(s) => Value::text(s),
        DataType::Int(v) => Value::Number(*v as f64),
        DataType::Float(v) => Value::Number(*v),
        DataType::Bool(v) => Value::text(if *v { "TRUE" } else { "FALSE" }),
        DataType::DateTime(_) => cell.as_date().map(Value::Date).unwrap_or(Value::Missing),
        #[allow(unreachable_patterns)]
        other => Value::text(&other.to_string()),
    }
}
