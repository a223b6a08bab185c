//! Select the admissions with a syphilis diagnosis.
use crate::{Record, Records, SchemaView};
use aho_corasick::AhoCorasick;
use qu::ick_use::*;

/// The spellings of syphilis that put a record in the cohort, lower case.
pub const SYPHILIS_TERMS: &[&str] = &["sífilis", "sifilis"];

/// Case-insensitive substring search for a fixed set of terms.
#[derive(Debug, Clone)]
pub struct DiagnosisMatcher {
    ac: AhoCorasick,
}

impl DiagnosisMatcher {
    /// Matcher for the given terms. Terms should already be lower case.
    pub fn new<S: AsRef<[u8]>>(terms: &[S]) -> Self {
        Self {
            ac: AhoCorasick::new(terms),
        }
    }

    pub fn syphilis() -> Self {
        Self::new(SYPHILIS_TERMS)
    }

    /// Does `text` contain any term, ignoring case.
    ///
    /// Lowercasing is done on the full Unicode text first, so `SÍFILIS` matches `sífilis`.
    /// Combining accents are dropped, so a decomposed `SI\u{301}FILIS` matches `sifilis`.
    pub fn is_match(&self, text: &str) -> bool {
        let folded: String = text
            .chars()
            .filter(|ch| !is_combining_mark(*ch))
            .flat_map(char::to_lowercase)
            .collect();
        self.ac.is_match(&folded)
    }

    /// Does any of `columns` hold a matching text value.
    ///
    /// Columns missing from the schema and empty cells never match.
    pub fn matches_record(&self, schema: &SchemaView, record: &Record, columns: &[&str]) -> bool {
        columns
            .iter()
            .filter_map(|column| schema.text(record, column).ok())
            .any(|text| self.is_match(text))
    }
}

/// Combining Diacritical Marks block.
fn is_combining_mark(ch: char) -> bool {
    ('\u{300}'..='\u{36f}').contains(&ch)
}

/// Keep the records where a present candidate column mentions syphilis.
///
/// With none of the candidates present the cohort is empty, not the whole table.
pub fn filter_cohort<S: AsRef<str>>(records: &Records, candidates: &[S]) -> Records {
    filter_with(records, candidates, &DiagnosisMatcher::syphilis())
}

pub fn filter_with<S: AsRef<str>>(
    records: &Records,
    candidates: &[S],
    matcher: &DiagnosisMatcher,
) -> Records {
    let schema = records.schema();
    let present = schema.present(candidates);
    for candidate in candidates.iter().map(|c| c.as_ref()) {
        if !schema.has(candidate) {
            event!(Level::DEBUG, "diagnosis column \"{}\" not in sheet", candidate);
        }
    }
    if present.is_empty() {
        event!(
            Level::WARN,
            "none of the diagnosis columns are in the sheet, the cohort is empty"
        );
    }
    let cohort = records.filter(|record| matcher.matches_record(schema, record, &present));
    event!(
        Level::INFO,
        "cohort: {} of {} records (searched {})",
        cohort.len(),
        records.len(),
        present.join(", ")
    );
    cohort
}

#[cfg(test)]
mod test {
    use super::{filter_cohort, DiagnosisMatcher};
    use crate::{ArcStr, Record, Records, Value};
    use proptest::prelude::*;

    fn records(columns: &[&str], rows: Vec<Vec<Value>>) -> Records {
        let columns: Vec<ArcStr> = columns.iter().map(|c| (*c).into()).collect();
        let els = rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .cloned()
                    .zip(row)
                    .fold(Record::default(), |rec, (col, val)| rec.with(col, val))
            })
            .collect();
        Records::new(columns, els)
    }

    #[test]
    fn matcher_ignores_case_and_accents_listed() {
        let m = DiagnosisMatcher::syphilis();
        assert!(m.is_match("Sífilis secundária"));
        assert!(m.is_match("NEUROSÍFILIS"));
        assert!(m.is_match("sifilis latente"));
        assert!(m.is_match("HIV + SIFILIS"));
        assert!(!m.is_match("HIV"));
        assert!(!m.is_match("sífil"));
    }

    #[test]
    fn decomposed_accents_match() {
        let m = DiagnosisMatcher::syphilis();
        assert!(m.is_match("SI\u{301}FILIS"));
        assert!(m.is_match("neurossi\u{301}filis"));
        assert!(!m.is_match("si\u{301}fil"));
    }

    #[test]
    fn any_present_column_can_match() {
        let table = records(
            &["DIAGNOSTICO_PRINCIPAL", "COMORBIDADES"],
            vec![
                vec!["HIV".into(), "Sífilis".into()],
                vec!["Sifilis".into(), Value::Missing],
                vec!["Tuberculose".into(), "HIV".into()],
                vec![Value::Missing, Value::Missing],
                vec![Value::Number(1.), "neurossífilis".into()],
            ],
        );
        let cohort = filter_cohort(
            &table,
            &["DIAGNOSTICO_PRINCIPAL", "COMORBIDADES", "NAO_EXISTE"],
        );
        assert_eq!(cohort.len(), 3);
        assert_eq!(cohort.columns(), table.columns());
    }

    #[test]
    fn no_candidate_columns_means_empty_cohort() {
        let table = records(&["OUTRA"], vec![vec!["sífilis".into()]]);
        assert!(filter_cohort(&table, &["DIAGNOSTICO_PRINCIPAL"]).is_empty());
        assert!(filter_cohort::<&str>(&table, &[]).is_empty());
    }

    #[test]
    fn absent_candidates_never_match() {
        // the record has the field, but the sheet doesn't list the column
        let table = Records::new(
            vec!["A".into()],
            vec![Record::default().with("A", "nada").with("B", "sífilis")],
        );
        assert!(filter_cohort(&table, &["A", "B"]).is_empty());
    }

    fn cell() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Missing),
            "[a-zA-Z ]{0,8}".prop_map(|s| Value::text(&s)),
            "[a-z ]{0,4}(sífilis|SIFILIS|Sífilis|sifilis)[a-z ]{0,4}".prop_map(|s| Value::text(&s)),
            (0.0..100.0f64).prop_map(Value::Number),
        ]
    }

    proptest! {
        #[test]
        fn member_iff_some_present_column_matches(
            rows in prop::collection::vec((cell(), cell(), cell()), 0..20)
        ) {
            let table = records(
                &["D1", "D2", "OTHER"],
                rows.iter().map(|(a, b, c)| vec![a.clone(), b.clone(), c.clone()]).collect(),
            );
            let cohort = filter_cohort(&table, &["D1", "D2", "ABSENT"]);
            let expected = rows
                .iter()
                .filter(|(a, b, _)| {
                    [a, b].iter().any(|v| {
                        v.as_text()
                            .map(|t| {
                                let t = t.to_lowercase();
                                t.contains("sifilis") || t.contains("sífilis")
                            })
                            .unwrap_or(false)
                    })
                })
                .count();
            prop_assert_eq!(cohort.len(), expected);
        }
    }
}
