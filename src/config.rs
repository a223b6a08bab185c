//! Report settings.
//!
//! Everything has a default, so an empty (or absent) config file is fine. Command line flags
//! override whatever the file says.
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Columns searched for a syphilis diagnosis, by canonical name.
pub const DEFAULT_DIAGNOSIS_COLUMNS: &[&str] = &[
    "DIAGNOSTICO_PRINCIPAL",
    "DIAGNOSTICO_SECUNDARIO",
    "DIAGNOSTICO",
    "COMORBIDADES",
    "COMORBIDADES_1",
    "OUTROS_DIAGNOSTICOS",
];

pub const DEFAULT_YEAR: i32 = 2022;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// The workbook to read.
    pub input: PathBuf,
    /// Sheet to read. Defaults to the report year.
    pub sheet: Option<String>,
    /// Year the report covers, used for the sheet name and the monthly series.
    pub year: i32,
    /// Directory the report is written to.
    pub output: PathBuf,
    pub title: String,
    pub diagnosis_columns: Vec<String>,
    pub columns: ColumnNames,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/internacoes.xlsx"),
            sheet: None,
            year: DEFAULT_YEAR,
            output: PathBuf::from("output"),
            title: "Coinfecção sífilis/HIV em pacientes internados".into(),
            diagnosis_columns: DEFAULT_DIAGNOSIS_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            columns: ColumnNames::default(),
        }
    }
}

impl ReportConfig {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<ReportConfig> {
            let text = fs::read_to_string(path)?;
            Ok(toml::from_str(&text)?)
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("loading report config from \"{}\"", path.display()))
    }

    /// Load settings from `path` if there is one, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// The sheet to read: the configured one, or the year.
    pub fn sheet_name(&self) -> String {
        self.sheet.clone().unwrap_or_else(|| self.year.to_string())
    }
}

/// Canonical names of the columns the report reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnNames {
    pub age: String,
    pub sex: String,
    pub admission: String,
    pub discharge: String,
    pub titration: String,
    pub outcome: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            age: "IDADE".into(),
            sex: "SEXO".into(),
            admission: "DATA_INTERNACAO".into(),
            discharge: "DATA_ALTA".into(),
            titration: "VDRL".into(),
            outcome: "DESFECHO".into(),
        }
    }
}

impl ColumnNames {
    /// Every configured column, with what it is used for.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            ("age", &*self.age),
            ("sex", &*self.sex),
            ("admission date", &*self.admission),
            ("discharge date", &*self.discharge),
            ("VDRL titration", &*self.titration),
            ("outcome", &*self.outcome),
        ]
        .into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::{ColumnNames, ReportConfig, DEFAULT_YEAR};
    use std::path::PathBuf;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: ReportConfig = toml::from_str("").unwrap();
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.sheet_name(), DEFAULT_YEAR.to_string());
    }

    #[test]
    fn partial_file() {
        let config: ReportConfig = toml::from_str(
            r#"
            input = "planilha.xlsx"
            year = 2021
            diagnosis_columns = ["CID"]

            [columns]
            age = "IDADE_ANOS"
            "#,
        )
        .unwrap();
        assert_eq!(config.input, PathBuf::from("planilha.xlsx"));
        assert_eq!(config.sheet_name(), "2021");
        assert_eq!(config.diagnosis_columns, ["CID"]);
        assert_eq!(config.columns.age, "IDADE_ANOS");
        assert_eq!(config.columns.sex, ColumnNames::default().sex);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<ReportConfig>("inptu = \"x.xlsx\"").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ReportConfig::load("does/not/exist.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("does/not/exist.toml"));
        assert_eq!(
            ReportConfig::load_or_default(None).unwrap(),
            ReportConfig::default()
        );
    }
}
