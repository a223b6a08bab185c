pub mod cohort;
pub mod columns;
pub mod config;
pub mod derive;
mod range;
pub mod render;
pub mod report;
pub mod schema;
pub mod sheet;
mod util;

pub use anyhow::{Context, Error};
use chrono::NaiveDate;
use qu::ick_use::*;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt,
    ops::Deref,
    path::Path,
    sync::Arc,
};

pub use crate::{
    cohort::DiagnosisMatcher,
    config::ReportConfig,
    derive::{AgeBand, Derived},
    range::{Range, RangeSet, RangeSetCountsWithMissing},
    report::Report,
    schema::{Absent, ParseStats, Parsed, SchemaView},
    sheet::RawTable,
    util::header,
};

pub type ArcStr = Arc<str>;
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

/// A single cell, after conversion from the spreadsheet.
///
/// Text is trimmed on the way in, and text that is empty after trimming is `Missing`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Missing,
    Text(ArcStr),
    Number(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            Value::Missing
        } else {
            Value::Text(s.into())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(&**s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) if n.fract() == 0. && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// One row of the admissions sheet, keyed by canonical column name.
///
/// There is deliberately no fixed struct here: which columns exist depends on the export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    fields: BTreeMap<ArcStr, Value>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn insert(&mut self, column: impl Into<ArcStr>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn with(mut self, column: impl Into<ArcStr>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }
}

/// All rows of the sheet with their canonical column list.
///
/// Cloning is cheap, rows are shared.
#[derive(Debug, Clone)]
pub struct Records {
    columns: Arc<Vec<ArcStr>>,
    schema: Arc<SchemaView>,
    els: Arc<Vec<Record>>,
}

impl Records {
    /// Normalize the raw headers and key every row by them.
    ///
    /// Short rows are padded with `Missing`, cells past the last header are dropped.
    pub fn from_raw(raw: RawTable) -> Self {
        let columns: Vec<ArcStr> = columns::normalize_columns(&raw.headers)
            .into_iter()
            .map(Into::into)
            .collect();
        let els = raw
            .rows
            .into_iter()
            .map(|row| {
                let mut cells = row.into_iter();
                let mut record = Record::default();
                for column in columns.iter() {
                    record.insert(column.clone(), cells.next().unwrap_or(Value::Missing));
                }
                record
            })
            .collect();
        event!(
            Level::DEBUG,
            "normalized {} columns: {}",
            columns.len(),
            columns.iter().map(|c| &**c).collect::<Vec<_>>().join(", ")
        );
        Self::new(columns, els)
    }

    /// Load and normalize one sheet of a workbook.
    pub fn load(path: impl AsRef<Path>, sheet: &str) -> Result<Self> {
        Ok(Self::from_raw(RawTable::load(path, sheet)?))
    }

    pub fn new(columns: Vec<ArcStr>, els: Vec<Record>) -> Self {
        let schema = SchemaView::new(columns.iter().cloned());
        Records {
            columns: Arc::new(columns),
            schema: Arc::new(schema),
            els: Arc::new(els),
        }
    }

    pub fn columns(&self) -> &[ArcStr] {
        &self.columns
    }

    /// The presence/accessor view for these columns, built once with them.
    pub fn schema(&self) -> &SchemaView {
        &self.schema
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.els.iter()
    }

    /// Get a `Records` object containing only rows that match the filter, with the same columns.
    pub fn filter(&self, f: impl Fn(&Record) -> bool) -> Self {
        Records {
            columns: self.columns.clone(),
            schema: self.schema.clone(),
            els: Arc::new(self.iter().filter(|rec| f(rec)).cloned().collect()),
        }
    }

    /// Show the first `count` rows in the terminal.
    pub fn term_table(&self, count: usize) -> term_data_table::Table<'static> {
        use term_data_table::{Cell, Row, Table};
        let mut table = Table::new().with_row(self.columns.iter().fold(
            Row::new(),
            |row, column| row.with_cell(Cell::from(column.to_string())),
        ));
        for record in self.iter().take(count) {
            table.add_row(self.columns.iter().fold(Row::new(), |row, column| {
                let value = record.get(column).map(ToString::to_string);
                row.with_cell(Cell::from(value.unwrap_or_default()))
            }));
        }
        table
    }
}

impl Deref for Records {
    type Target = [Record];
    fn deref(&self) -> &Self::Target {
        &self.els
    }
}

impl<'a> IntoIterator for &'a Records {
    type IntoIter = <&'a [Record] as IntoIterator>::IntoIter;
    type Item = &'a Record;
    fn into_iter(self) -> Self::IntoIter {
        self.els.iter()
    }
}

pub fn check_extension(path: &Path, exts: &[&str]) -> Result<()> {
    ensure!(
        matches!(path.extension().and_then(|p| p.to_str()), Some(p) if exts.iter().any(|ext| p.eq_ignore_ascii_case(ext))),
        "filename should end with one of {}",
        exts.iter().map(|ext| format!("`.{}`", ext)).collect::<Vec<_>>().join(", ")
    );
    Ok(())
}
