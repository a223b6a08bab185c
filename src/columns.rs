//! Turn the free-form column labels of a hospital export into canonical identifiers.
//!
//! Exports from different wards and years disagree on case, accents, punctuation and even
//! spelling ("Data de Internação", "DT. INTERNACAO", "data internaçao" all mean the same thing).
//! Every label goes through the same steps:
//!
//! 1. Trim and upper-case.
//! 2. Runs of whitespace and `.` become a single `_`.
//! 3. The literal corrections in [`REPLACEMENTS`] are applied, in order.
//! 4. Accented letters are folded to ASCII and anything else outside `[A-Z0-9_]` becomes `_`.
//! 5. Duplicates get a numeric suffix, in input order.
//!
//! Steps 3 and 4 are repeated until the label stops changing, so that normalizing a list of
//! canonical names gives the same list back.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

/// Literal corrections, applied in order.
///
/// These are historical inconsistencies seen in real exports, keep the list and its order as is.
/// Some entries target text produced by an earlier entry (`DT_DE_ALTA` -> `DATA_DE_ALTA` ->
/// `DATA_ALTA`).
pub const REPLACEMENTS: &[(&str, &str)] = &[
    ("DIAGINÓSTICO", "DIAGNÓSTICO"),
    ("DIAGINOSTICO", "DIAGNOSTICO"),
    ("DIAGNÓSTICO", "DIAGNOSTICO"),
    ("INTERNAÇÃO", "INTERNACAO"),
    ("INTERNAÇAO", "INTERNACAO"),
    ("DT_", "DATA_"),
    ("DATA_DE_", "DATA_"),
    ("Nº", "NUMERO"),
    ("N°", "NUMERO"),
    ("SÍFILIS", "SIFILIS"),
    ("TITULAÇÃO", "TITULACAO"),
    ("COMORBIDADE_", "COMORBIDADES_"),
];

/// Name used when nothing of a label survives normalization.
pub const EMPTY_LABEL: &str = "COLUMN";

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s.]+").unwrap());
static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

/// Normalize a list of raw labels.
///
/// The output has the same length and order as the input, and contains no duplicates.
pub fn normalize_columns<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let bases: Vec<String> = labels
        .iter()
        .map(|label| normalize_label(label.as_ref()))
        .collect();
    dedup(bases)
}

/// Normalize a single label, without the uniqueness step.
pub fn normalize_label(label: &str) -> String {
    let upper = label.trim().to_uppercase();
    let mut current = SEPARATORS.replace_all(&upper, "_").into_owned();
    // Terminates: the only corrections that can fire again after folding shorten the label.
    loop {
        let next = fold(&apply_replacements(&current));
        if next == current {
            break;
        }
        current = next;
    }
    if current.is_empty() {
        EMPTY_LABEL.to_owned()
    } else {
        current
    }
}

fn apply_replacements(label: &str) -> String {
    REPLACEMENTS
        .iter()
        .fold(label.to_owned(), |acc, (from, to)| acc.replace(from, to))
}

/// Map every character to `[A-Z0-9_]`, then tidy underscores.
fn fold(label: &str) -> String {
    let folded: String = label.chars().map(fold_char).collect();
    let collapsed = UNDERSCORES.replace_all(&folded, "_");
    collapsed.trim_matches('_').to_owned()
}

fn fold_char(ch: char) -> char {
    match ch {
        'A'..='Z' | '0'..='9' | '_' => ch,
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'ª' => 'A',
        'Ç' => 'C',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'Ñ' => 'N',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'º' | '°' => 'O',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'Ý' => 'Y',
        _ => '_',
    }
}

/// Give second and later occurrences of a name the smallest free `_N` suffix.
///
/// A suffixed name never takes a name that another label normalizes to on its own, so
/// `["A", "A", "A_1"]` becomes `["A", "A_2", "A_1"]`.
fn dedup(bases: Vec<String>) -> Vec<String> {
    let reserved: HashSet<String> = bases.iter().cloned().collect();
    let mut taken = BTreeSet::new();
    let mut out = Vec::with_capacity(bases.len());
    for base in bases {
        let name = if taken.contains(&base) {
            (1..)
                .map(|n| suffixed(&base, n))
                .find(|candidate| !taken.contains(candidate) && !reserved.contains(candidate))
                .unwrap_or_else(|| unreachable!("suffixes are unbounded"))
        } else {
            base
        };
        taken.insert(name.clone());
        out.push(name);
    }
    out
}

/// `BASE_N`, unless that would itself be rewritten by a correction (`DT_1` -> `DATA_1`), in
/// which case the digits are appended directly.
fn suffixed(base: &str, n: usize) -> String {
    let candidate = format!("{}_{}", base, n);
    if normalize_label(&candidate) == candidate {
        candidate
    } else {
        format!("{}{}", base, n)
    }
}
