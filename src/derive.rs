//! Analysis variables computed for every cohort record.
//!
//! Each field is computed on its own: a bad admission date does not stop the age band or the
//! titration from being read.
use crate::{
    config::ColumnNames,
    range::{Range, RangeSet},
    schema::{parse_number_str, Absent, ParseStats, Parsed},
    Record, Records, SchemaView, Value,
};
use chrono::{Datelike, NaiveDate};
use noisy_float::prelude::*;
use serde::Serialize;
use std::fmt;

/// Names under which parse outcomes are counted in [`ParseStats`].
pub mod field {
    pub const AGE: &str = "age";
    pub const ADMISSION: &str = "admission date";
    pub const DISCHARGE: &str = "discharge date";
    pub const TITRATION: &str = "VDRL titration";
}

/// Age bands used throughout the report.
///
/// Bounds are right-open. They are not decade boundaries: 19 is already in "20-29".
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub enum AgeBand {
    #[serde(rename = "0-19")]
    Under20,
    #[serde(rename = "20-29")]
    Twenties,
    #[serde(rename = "30-39")]
    Thirties,
    #[serde(rename = "40-49")]
    Forties,
    #[serde(rename = "50-59")]
    Fifties,
    #[serde(rename = "60-69")]
    Sixties,
    #[serde(rename = "70+")]
    SeventyPlus,
}

impl AgeBand {
    pub const ALL: [AgeBand; 7] = [
        AgeBand::Under20,
        AgeBand::Twenties,
        AgeBand::Thirties,
        AgeBand::Forties,
        AgeBand::Fifties,
        AgeBand::Sixties,
        AgeBand::SeventyPlus,
    ];

    pub fn label(self) -> &'static str {
        use AgeBand::*;
        match self {
            Under20 => "0-19",
            Twenties => "20-29",
            Thirties => "30-39",
            Forties => "40-49",
            Fifties => "50-59",
            Sixties => "60-69",
            SeventyPlus => "70+",
        }
    }

    /// The ages covered by this band.
    pub fn range(self) -> Range<R64> {
        use AgeBand::*;
        let (from, to) = match self {
            Under20 => (0., Some(19.)),
            Twenties => (19., Some(29.)),
            Thirties => (29., Some(39.)),
            Forties => (39., Some(49.)),
            Fifties => (49., Some(59.)),
            Sixties => (59., Some(70.)),
            SeventyPlus => (70., None),
        };
        Range::labelled(r64(from), to.map(r64), self.label())
    }

    /// All bands as a range set, in order.
    pub fn range_set() -> RangeSet<R64> {
        RangeSet::new(Self::ALL.iter().map(|band| band.range()).collect())
    }

    /// The band for an age, or `None` for negative or non-finite ages.
    pub fn from_age(age: f64) -> Option<Self> {
        let age = R64::try_new(age)?;
        Self::ALL
            .iter()
            .copied()
            .find(|band| band.range().contains(&age))
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read a VDRL titration such as `1/256` as its denominator.
///
/// Plain numbers are taken as they are. Anything else ("reagente", "não reagente") is
/// unparsable.
pub fn parse_titration(value: &Value) -> Parsed<f64> {
    match value {
        Value::Missing => Err(Absent::Missing),
        Value::Number(n) if n.is_finite() => Ok(*n),
        Value::Number(_) | Value::Date(_) => Err(Absent::Unparsable),
        Value::Text(s) => titration_str(s).ok_or(Absent::Unparsable),
    }
}

fn titration_str(s: &str) -> Option<f64> {
    let s = s.trim();
    let rest = match s.strip_prefix('1') {
        Some(rest) if rest.trim_start().starts_with('/') => rest.trim_start()[1..].trim_start(),
        _ => s,
    };
    parse_number_str(rest)
}

/// First day of the month `date` falls in.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .unwrap_or_else(|| unreachable!("every month has a first day"))
}

/// Days from admission to discharge. Negative when the dates are the wrong way round.
pub fn stay_days(admission: Option<NaiveDate>, discharge: Option<NaiveDate>) -> Option<i64> {
    Some((discharge? - admission?).num_days())
}

/// The derived fields of one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Derived {
    pub age: Option<f64>,
    pub age_band: Option<AgeBand>,
    pub admission: Option<NaiveDate>,
    pub discharge: Option<NaiveDate>,
    pub stay_days: Option<i64>,
    pub titration: Option<f64>,
    pub admission_month: Option<NaiveDate>,
}

impl Derived {
    /// Compute every field of `record`, counting parse outcomes in `stats`.
    pub fn compute(
        record: &Record,
        schema: &SchemaView,
        columns: &ColumnNames,
        stats: &mut ParseStats,
    ) -> Self {
        let age = stats
            .record(field::AGE, schema.number(record, &columns.age))
            .ok();
        let admission = stats
            .record(field::ADMISSION, schema.date(record, &columns.admission))
            .ok();
        let discharge = stats
            .record(field::DISCHARGE, schema.date(record, &columns.discharge))
            .ok();
        let titration = stats
            .record(
                field::TITRATION,
                parse_titration(schema.value(record, &columns.titration)),
            )
            .ok();

        Derived {
            age,
            age_band: age.and_then(AgeBand::from_age),
            admission,
            discharge,
            stay_days: stay_days(admission, discharge),
            titration,
            admission_month: admission.map(month_start),
        }
    }
}

/// Derive fields for every record, in order.
pub fn derive_all(records: &Records, columns: &ColumnNames) -> (Vec<Derived>, ParseStats) {
    let schema = records.schema();
    let mut stats = ParseStats::new();
    let derived = records
        .iter()
        .map(|record| Derived::compute(record, schema, columns, &mut stats))
        .collect();
    (derived, stats)
}

#[cfg(test)]
mod test {
    use super::{derive_all, month_start, parse_titration, stay_days, AgeBand};
    use crate::{config::ColumnNames, schema::Absent, Record, Records, Value};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_band_boundaries() {
        assert_eq!(AgeBand::from_age(0.), Some(AgeBand::Under20));
        assert_eq!(AgeBand::from_age(18.9), Some(AgeBand::Under20));
        assert_eq!(AgeBand::from_age(19.), Some(AgeBand::Twenties));
        assert_eq!(AgeBand::from_age(29.), Some(AgeBand::Thirties));
        assert_eq!(AgeBand::from_age(59.), Some(AgeBand::Sixties));
        assert_eq!(AgeBand::from_age(69.), Some(AgeBand::Sixties));
        assert_eq!(AgeBand::from_age(70.), Some(AgeBand::SeventyPlus));
        assert_eq!(AgeBand::from_age(104.), Some(AgeBand::SeventyPlus));
        assert_eq!(AgeBand::from_age(-1.), None);
        assert_eq!(AgeBand::from_age(f64::NAN), None);
    }

    #[test]
    fn age_band_labels() {
        assert_eq!(AgeBand::from_age(19.).unwrap().to_string(), "20-29");
        let labels: Vec<String> = AgeBand::range_set().iter().map(|r| r.to_string()).collect();
        assert_eq!(
            labels,
            ["0-19", "20-29", "30-39", "40-49", "50-59", "60-69", "70+"]
        );
    }

    #[test]
    fn titration() {
        assert_eq!(parse_titration(&Value::text("1/256")), Ok(256.));
        assert_eq!(parse_titration(&Value::text(" 1 / 32 ")), Ok(32.));
        assert_eq!(parse_titration(&Value::text("256")), Ok(256.));
        assert_eq!(parse_titration(&Value::text("1")), Ok(1.));
        assert_eq!(parse_titration(&Value::Number(64.)), Ok(64.));
        assert_eq!(parse_titration(&Value::text("reagente")), Err(Absent::Unparsable));
        assert_eq!(parse_titration(&Value::text("1/")), Err(Absent::Unparsable));
        assert_eq!(parse_titration(&Value::Missing), Err(Absent::Missing));
    }

    #[test]
    fn stay_is_not_clamped() {
        assert_eq!(stay_days(Some(ymd(2022, 3, 1)), Some(ymd(2022, 3, 5))), Some(4));
        assert_eq!(stay_days(Some(ymd(2022, 3, 5)), Some(ymd(2022, 3, 1))), Some(-4));
        assert_eq!(stay_days(None, Some(ymd(2022, 3, 1))), None);
        assert_eq!(stay_days(Some(ymd(2022, 3, 1)), None), None);
    }

    #[test]
    fn months() {
        assert_eq!(month_start(ymd(2022, 2, 28)), ymd(2022, 2, 1));
        assert_eq!(month_start(ymd(2022, 12, 1)), ymd(2022, 12, 1));
    }

    #[test]
    fn fields_are_independent() {
        let columns = ColumnNames::default();
        let records = Records::new(
            vec![
                "IDADE".into(),
                "DATA_INTERNACAO".into(),
                "DATA_ALTA".into(),
                "VDRL".into(),
            ],
            vec![
                Record::default()
                    .with("IDADE", 19.)
                    .with("DATA_INTERNACAO", "01-03-2022")
                    .with("DATA_ALTA", "05-03-2022")
                    .with("VDRL", "1/256"),
                Record::default()
                    .with("IDADE", "desconhecida")
                    .with("DATA_INTERNACAO", "31/02/2022")
                    .with("DATA_ALTA", "05/03/2022")
                    .with("VDRL", "reagente"),
                Record::default().with("IDADE", 45.),
            ],
        );
        let (derived, stats) = derive_all(&records, &columns);

        assert_eq!(derived[0].age_band, Some(AgeBand::Twenties));
        assert_eq!(derived[0].stay_days, Some(4));
        assert_eq!(derived[0].titration, Some(256.));
        assert_eq!(derived[0].admission_month, Some(ymd(2022, 3, 1)));

        assert_eq!(derived[1].age_band, None);
        assert_eq!(derived[1].admission, None);
        assert_eq!(derived[1].discharge, Some(ymd(2022, 3, 5)));
        assert_eq!(derived[1].stay_days, None);
        assert_eq!(derived[1].admission_month, None);

        assert_eq!(derived[2].age_band, Some(AgeBand::Forties));
        assert_eq!(derived[2].admission, None);

        assert_eq!(stats.get(super::field::AGE).unparsable, 1);
        assert_eq!(stats.get(super::field::ADMISSION).unparsable, 1);
        assert_eq!(stats.get(super::field::ADMISSION).missing, 1);
        assert_eq!(stats.get(super::field::TITRATION).parsed, 1);
    }
}
