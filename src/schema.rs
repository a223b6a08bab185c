//! Column presence and typed access to records.
//!
//! Which columns exist is decided once, when the sheet is normalized. Everything downstream
//! asks the [`SchemaView`] rather than poking at records directly, and every typed read comes back
//! as a [`Parsed`] value: either the value, or the reason there isn't one.
use crate::{ArcStr, Record, Value};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::{collections::BTreeMap, collections::BTreeSet, fmt};

/// Why a typed read produced nothing.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize)]
pub enum Absent {
    /// The column does not exist, or the cell is empty.
    Missing,
    /// The cell has a value that can't be read as the requested type.
    Unparsable,
}

impl fmt::Display for Absent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Absent::Missing => f.write_str("missing"),
            Absent::Unparsable => f.write_str("unparsable"),
        }
    }
}

pub type Parsed<T> = std::result::Result<T, Absent>;

static MISSING: Value = Value::Missing;

/// Textual date layouts, day first. Tried in order.
///
/// Two digit years go first: `%Y` would happily read `22` as the year 22.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y",
    "%d-%m-%y",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
];
const DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// The set of canonical columns of a sheet.
#[derive(Debug, Clone, Default)]
pub struct SchemaView {
    columns: BTreeSet<ArcStr>,
}

impl SchemaView {
    pub fn new(columns: impl IntoIterator<Item = ArcStr>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    pub fn has(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// The candidates that exist in this sheet, in the order given.
    pub fn present<'a, S: AsRef<str>>(&self, candidates: &'a [S]) -> Vec<&'a str> {
        candidates
            .iter()
            .map(|column| column.as_ref())
            .filter(|column| self.has(column))
            .collect()
    }

    /// The raw value, or `Missing` when the column doesn't exist.
    pub fn value<'r>(&self, record: &'r Record, column: &str) -> &'r Value {
        if !self.has(column) {
            return &MISSING;
        }
        record.get(column).unwrap_or(&MISSING)
    }

    pub fn text<'r>(&self, record: &'r Record, column: &str) -> Parsed<&'r str> {
        match self.value(record, column) {
            Value::Missing => Err(Absent::Missing),
            Value::Text(s) => Ok(&**s),
            // numbers and dates are shown as text, but we don't hand out borrowed text for them
            _ => Err(Absent::Unparsable),
        }
    }

    /// Like [`SchemaView::text`], but numbers and dates are formatted.
    pub fn label(&self, record: &Record, column: &str) -> Parsed<String> {
        match self.value(record, column) {
            Value::Missing => Err(Absent::Missing),
            other => Ok(other.to_string()),
        }
    }

    pub fn number(&self, record: &Record, column: &str) -> Parsed<f64> {
        parse_number(self.value(record, column))
    }

    pub fn date(&self, record: &Record, column: &str) -> Parsed<NaiveDate> {
        parse_date(self.value(record, column))
    }
}

/// Read a value as a finite number. Text using a decimal comma is accepted.
pub fn parse_number(value: &Value) -> Parsed<f64> {
    match value {
        Value::Missing => Err(Absent::Missing),
        Value::Number(n) if n.is_finite() => Ok(*n),
        Value::Number(_) | Value::Date(_) => Err(Absent::Unparsable),
        Value::Text(s) => parse_number_str(s).ok_or(Absent::Unparsable),
    }
}

pub(crate) fn parse_number_str(s: &str) -> Option<f64> {
    let s = s.trim();
    let n = match s.parse::<f64>() {
        Ok(n) => n,
        Err(_) => s.replace(',', ".").parse::<f64>().ok()?,
    };
    if n.is_finite() {
        Some(n)
    } else {
        None
    }
}

/// Read a value as a date, day-month-year for text.
pub fn parse_date(value: &Value) -> Parsed<NaiveDate> {
    match value {
        Value::Missing => Err(Absent::Missing),
        Value::Date(d) => Ok(*d),
        Value::Number(_) => Err(Absent::Unparsable),
        Value::Text(s) => parse_date_str(s).ok_or(Absent::Unparsable),
    }
}

pub(crate) fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// How many reads of each field worked, were empty, or failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldStats {
    pub parsed: usize,
    pub missing: usize,
    pub unparsable: usize,
}

/// Counts of parse outcomes per derived field.
///
/// Failed parses are counted here instead of being reported one by one.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ParseStats {
    fields: BTreeMap<&'static str, FieldStats>,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome and pass it on unchanged.
    pub fn record<T>(&mut self, field: &'static str, outcome: Parsed<T>) -> Parsed<T> {
        let stats = self.fields.entry(field).or_default();
        match &outcome {
            Ok(_) => stats.parsed += 1,
            Err(Absent::Missing) => stats.missing += 1,
            Err(Absent::Unparsable) => stats.unparsable += 1,
        }
        outcome
    }

    pub fn get(&self, field: &str) -> FieldStats {
        self.fields.get(field).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FieldStats)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, *v))
    }

    pub fn total_unparsable(&self) -> usize {
        self.fields.values().map(|s| s.unparsable).sum()
    }
}

#[cfg(test)]
mod test {
    use super::{parse_date, parse_number, Absent, ParseStats, SchemaView};
    use crate::{Record, Value};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dates_are_day_first() {
        assert_eq!(parse_date(&Value::text("01-03-2022")), Ok(ymd(2022, 3, 1)));
        assert_eq!(parse_date(&Value::text("05/03/2022")), Ok(ymd(2022, 3, 5)));
        assert_eq!(parse_date(&Value::text("12.11.2022")), Ok(ymd(2022, 11, 12)));
        assert_eq!(parse_date(&Value::text("31/12/22")), Ok(ymd(2022, 12, 31)));
        assert_eq!(
            parse_date(&Value::text("05/03/2022 14:30:00")),
            Ok(ymd(2022, 3, 5))
        );
        assert_eq!(parse_date(&Value::text("2022-03-05")), Ok(ymd(2022, 3, 5)));
        assert_eq!(parse_date(&Value::Date(ymd(2022, 1, 9))), Ok(ymd(2022, 1, 9)));
    }

    #[test]
    fn bad_dates_are_absent() {
        assert_eq!(parse_date(&Value::text("13/13/2022")), Err(Absent::Unparsable));
        assert_eq!(parse_date(&Value::text("ignorado")), Err(Absent::Unparsable));
        assert_eq!(parse_date(&Value::Number(44621.)), Err(Absent::Unparsable));
        assert_eq!(parse_date(&Value::Missing), Err(Absent::Missing));
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number(&Value::Number(42.)), Ok(42.));
        assert_eq!(parse_number(&Value::text("42")), Ok(42.));
        assert_eq!(parse_number(&Value::text("36,5")), Ok(36.5));
        assert_eq!(parse_number(&Value::text("NaN")), Err(Absent::Unparsable));
        assert_eq!(parse_number(&Value::text("dois")), Err(Absent::Unparsable));
        assert_eq!(parse_number(&Value::Missing), Err(Absent::Missing));
    }

    #[test]
    fn absent_columns_read_as_missing() {
        let schema = SchemaView::new(vec!["IDADE".into()]);
        let record = Record::default()
            .with("IDADE", 30.)
            .with("NOT_IN_SCHEMA", 1.);
        assert!(schema.has("IDADE"));
        assert!(!schema.has("SEXO"));
        assert_eq!(schema.number(&record, "IDADE"), Ok(30.));
        assert_eq!(schema.number(&record, "SEXO"), Err(Absent::Missing));
        assert_eq!(schema.number(&record, "NOT_IN_SCHEMA"), Err(Absent::Missing));
        assert_eq!(schema.present(&["SEXO", "IDADE"]), ["IDADE"]);
    }

    #[test]
    fn text_and_labels() {
        let schema = SchemaView::new(vec!["SEXO".into(), "IDADE".into()]);
        let record = Record::default().with("SEXO", "F").with("IDADE", 30.);
        assert_eq!(schema.text(&record, "SEXO"), Ok("F"));
        assert_eq!(schema.text(&record, "IDADE"), Err(Absent::Unparsable));
        assert_eq!(schema.label(&record, "IDADE"), Ok("30".to_string()));
    }

    #[test]
    fn stats_count_outcomes() {
        let mut stats = ParseStats::new();
        assert_eq!(stats.record("age", Ok(1)), Ok(1));
        stats.record::<i32>("age", Err(Absent::Missing));
        stats.record::<i32>("age", Err(Absent::Unparsable));
        stats.record::<i32>("date", Err(Absent::Unparsable));
        let age = stats.get("age");
        assert_eq!((age.parsed, age.missing, age.unparsable), (1, 1, 1));
        assert_eq!(stats.total_unparsable(), 2);
        assert_eq!(stats.get("nothing").parsed, 0);
    }
}
