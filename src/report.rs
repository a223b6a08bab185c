//! The fixed sequence of tables that makes up the report.
//!
//! All percentages use the cohort size as denominator. An empty cohort gives zero counts and 0%
//! everywhere, never NaN.
use crate::{
    cohort,
    config::ReportConfig,
    derive::{self, field, AgeBand, Derived},
    range::{Range, RangeSet},
    schema::{ParseStats, SchemaView},
    Records,
};
use chrono::{Datelike, NaiveDate};
use noisy_float::prelude::*;
use qu::ick_use::*;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Max, Median, Min, OrderStatistics};
use std::collections::BTreeMap;

/// Label used for rows counting absent values.
pub const MISSING_LABEL: &str = "missing";

/// `count` as a percentage of `total`, 0 when `total` is 0.
pub fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.
    } else {
        count as f64 / total as f64 * 100.
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRow {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

/// Counts per category, with percentages of `total`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountTable {
    /// Heading of the category column.
    pub category: String,
    pub rows: Vec<CountRow>,
    pub total: usize,
}

impl CountTable {
    pub fn new(
        category: impl Into<String>,
        counts: impl IntoIterator<Item = (String, usize)>,
        total: usize,
    ) -> Self {
        Self {
            category: category.into(),
            rows: counts
                .into_iter()
                .map(|(label, count)| CountRow {
                    label,
                    count,
                    percent: percent(count, total),
                })
                .collect(),
            total,
        }
    }

    pub fn get(&self, label: &str) -> Option<&CountRow> {
        self.rows.iter().find(|row| row.label == label)
    }
}

/// Summary of a numeric variable, over the values that were present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub lower_quartile: f64,
    pub upper_quartile: f64,
    pub min: f64,
    pub max: f64,
}

impl NumericSummary {
    /// `None` when there are no values.
    pub fn from_values(values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let mut data = Data::new(values);
        Some(NumericSummary {
            n,
            mean: data.mean().unwrap_or_default(),
            median: data.median(),
            lower_quartile: data.lower_quartile(),
            upper_quartile: data.upper_quartile(),
            min: data.min(),
            max: data.max(),
        })
    }
}

/// Admissions per month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySeries {
    pub points: Vec<(NaiveDate, usize)>,
}

impl MonthlySeries {
    /// Every month of `year`, zero filled, plus any other month that occurs.
    pub fn new(year: i32, months: impl Iterator<Item = NaiveDate>) -> Self {
        let mut counts: BTreeMap<NaiveDate, usize> = (1..=12)
            .filter_map(|month| NaiveDate::from_ymd_opt(year, month, 1))
            .map(|month| (month, 0))
            .collect();
        for month in months {
            *counts.entry(derive::month_start(month)).or_default() += 1;
        }
        MonthlySeries {
            points: counts.into_iter().collect(),
        }
    }

    pub fn total(&self) -> usize {
        self.points.iter().map(|(_, count)| count).sum()
    }

    /// No admissions at all.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

pub fn month_label(month: NaiveDate) -> String {
    format!("{:02}/{}", month.month(), month.year())
}

/// One block of content within a section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Body {
    KeyValues { rows: Vec<(String, String)> },
    Counts(CountTable),
    Numeric {
        unit: &'static str,
        summary: Option<NumericSummary>,
    },
    Chart(MonthlySeries),
    /// The data needed for this part isn't in the sheet.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub body: Vec<Body>,
}

impl Section {
    fn new(title: impl Into<String>, body: Vec<Body>) -> Self {
        Self {
            title: title.into(),
            body,
        }
    }

    fn unavailable(title: impl Into<String>, column: &str) -> Self {
        Self::new(
            title,
            vec![Body::Unavailable {
                reason: format!("column `{}` not present in the sheet", column),
            }],
        )
    }
}

/// Everything that goes into the rendered document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    pub year: i32,
    pub total_records: usize,
    pub cohort_size: usize,
    pub parse_stats: ParseStats,
    pub sections: Vec<Section>,
}

impl Report {
    /// Run the pipeline on normalized records: filter the cohort, derive fields, tabulate.
    pub fn build(records: &Records, config: &ReportConfig) -> Self {
        let cohort = cohort::filter_cohort(records, &config.diagnosis_columns);
        let (derived, stats) = derive::derive_all(&cohort, &config.columns);
        let unparsable = stats.total_unparsable();
        if unparsable > 0 {
            event!(
                Level::INFO,
                "{} values could not be read and are treated as missing",
                unparsable
            );
        }
        for (name, counts) in stats.iter().filter(|(_, counts)| counts.unparsable > 0) {
            event!(Level::DEBUG, "{}: {} unreadable", name, counts.unparsable);
        }
        Tabulator {
            config,
            cohort: &cohort,
            schema: cohort.schema(),
            derived: &derived,
        }
        .report(records.len(), stats)
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }
}

/// Section titles, in report order.
pub mod titles {
    pub const OVERVIEW: &str = "Overview";
    pub const SEX: &str = "Sex";
    pub const AGE: &str = "Age";
    pub const STAY: &str = "Length of stay";
    pub const TITRATION: &str = "VDRL titration";
    pub const OUTCOME: &str = "Outcome";
    pub const MONTHLY: &str = "Admissions per month";
}

struct Tabulator<'a> {
    config: &'a ReportConfig,
    cohort: &'a Records,
    schema: &'a SchemaView,
    derived: &'a [Derived],
}

impl<'a> Tabulator<'a> {
    fn report(&self, total_records: usize, stats: ParseStats) -> Report {
        let sections = vec![
            self.overview(total_records, &stats),
            self.categorical(titles::SEX, "Sex", &self.config.columns.sex),
            self.age(),
            self.stay(),
            self.titration(),
            self.categorical(titles::OUTCOME, "Outcome", &self.config.columns.outcome),
            self.monthly(),
        ];
        Report {
            title: self.config.title.clone(),
            year: self.config.year,
            total_records,
            cohort_size: self.cohort_size(),
            parse_stats: stats,
            sections,
        }
    }

    fn cohort_size(&self) -> usize {
        self.cohort.len()
    }

    fn overview(&self, total_records: usize, stats: &ParseStats) -> Section {
        let n = self.cohort_size();
        let mut rows = vec![
            ("Records in sheet".to_string(), total_records.to_string()),
            ("Records with a syphilis diagnosis".to_string(), n.to_string()),
            (
                "Share of all records".to_string(),
                format!("{:.1}%", percent(n, total_records)),
            ),
        ];
        for name in [field::AGE, field::ADMISSION, field::DISCHARGE, field::TITRATION] {
            let stat = stats.get(name);
            rows.push((
                format!("{}: missing / unreadable", name),
                format!("{} / {}", stat.missing, stat.unparsable),
            ));
        }
        Section::new(titles::OVERVIEW, vec![Body::KeyValues { rows }])
    }

    /// Counts per distinct value of a text column, sorted by value, missing last.
    fn categorical(&self, title: &str, category: &str, column: &str) -> Section {
        let schema = self.schema;
        if !schema.has(column) {
            return Section::unavailable(title, column);
        }
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut missing = 0;
        for record in self.cohort.iter() {
            match schema.label(record, column) {
                Ok(label) => *counts.entry(label).or_default() += 1,
                Err(_) => missing += 1,
            }
        }
        let rows = counts
            .into_iter()
            .chain(std::iter::once((MISSING_LABEL.to_string(), missing)));
        Section::new(
            title,
            vec![Body::Counts(CountTable::new(category, rows, self.cohort_size()))],
        )
    }

    fn age(&self) -> Section {
        let schema = self.schema;
        let column = &self.config.columns.age;
        if !schema.has(column) {
            return Section::unavailable(titles::AGE, column);
        }
        let counts = AgeBand::range_set().bucket_values_with_missing(
            self.derived
                .iter()
                .map(|d| d.age.and_then(R64::try_new)),
        );
        let rows = counts
            .for_display()
            .map(|(label, count)| (label.to_string(), count))
            .collect::<Vec<_>>();
        let summary = NumericSummary::from_values(self.derived.iter().filter_map(|d| d.age).collect());
        Section::new(
            titles::AGE,
            vec![
                Body::Counts(CountTable::new("Age band", rows, self.cohort_size())),
                Body::Numeric {
                    unit: "years",
                    summary,
                },
            ],
        )
    }

    fn stay(&self) -> Section {
        let schema = self.schema;
        for column in [&self.config.columns.admission, &self.config.columns.discharge] {
            if !schema.has(column) {
                return Section::unavailable(titles::STAY, column);
            }
        }
        let stays: Vec<i64> = self.derived.iter().filter_map(|d| d.stay_days).collect();
        let negative = stays.iter().filter(|days| **days < 0).count();
        let summary = NumericSummary::from_values(stays.iter().map(|d| *d as f64).collect());
        let counts = stay_bands()
            .bucket_values_with_missing(self.derived.iter().map(|d| d.stay_days));
        let rows = counts
            .for_display()
            .map(|(label, count)| (label.to_string(), count))
            .collect::<Vec<_>>();
        Section::new(
            titles::STAY,
            vec![
                Body::Numeric {
                    unit: "days",
                    summary,
                },
                Body::KeyValues {
                    rows: vec![(
                        "Discharge before admission".to_string(),
                        negative.to_string(),
                    )],
                },
                Body::Counts(CountTable::new("Days", rows, self.cohort_size())),
            ],
        )
    }

    fn titration(&self) -> Section {
        let schema = self.schema;
        let column = &self.config.columns.titration;
        if !schema.has(column) {
            return Section::unavailable(titles::TITRATION, column);
        }
        let mut counts: BTreeMap<R64, usize> = BTreeMap::new();
        let mut missing = 0;
        for value in self.derived.iter().map(|d| d.titration.and_then(R64::try_new)) {
            match value {
                Some(titre) => *counts.entry(titre).or_default() += 1,
                None => missing += 1,
            }
        }
        let rows = counts
            .into_iter()
            .map(|(titre, count)| (titre_label(titre.raw()), count))
            .chain(std::iter::once((MISSING_LABEL.to_string(), missing)));
        let summary =
            NumericSummary::from_values(self.derived.iter().filter_map(|d| d.titration).collect());
        Section::new(
            titles::TITRATION,
            vec![
                Body::Counts(CountTable::new("Titre", rows, self.cohort_size())),
                Body::Numeric {
                    unit: "dilution",
                    summary,
                },
            ],
        )
    }

    fn monthly(&self) -> Section {
        let schema = self.schema;
        let column = &self.config.columns.admission;
        if !schema.has(column) {
            return Section::unavailable(titles::MONTHLY, column);
        }
        let series = MonthlySeries::new(
            self.config.year,
            self.derived.iter().filter_map(|d| d.admission_month),
        );
        let rows = series
            .points
            .iter()
            .map(|(month, count)| (month_label(*month), *count))
            .collect::<Vec<_>>();
        Section::new(
            titles::MONTHLY,
            vec![
                Body::Counts(CountTable::new("Month", rows, self.cohort_size())),
                Body::Chart(series),
            ],
        )
    }
}

/// Length of stay bands, in days.
fn stay_bands() -> RangeSet<i64> {
    RangeSet::new(vec![
        Range::labelled(i64::MIN, Some(0), "negative"),
        Range::labelled(0, Some(8), "0-7"),
        Range::labelled(8, Some(15), "8-14"),
        Range::labelled(15, Some(31), "15-30"),
        Range::labelled(31, None, "31+"),
    ])
}

/// `1/N`, with N shown as an integer where it is one.
pub fn titre_label(titre: f64) -> String {
    if titre.fract() == 0. && titre.abs() < 1e15 {
        format!("1/{}", titre as i64)
    } else {
        format!("1/{}", titre)
    }
}
