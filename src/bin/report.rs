use clap::Parser;
use coinfection_report::{header, render, Records, Report, ReportConfig};
use qu::ick_use::*;
use std::path::PathBuf;

#[derive(Parser)]
struct Opt {
    /// A TOML file with report settings. Flags below override it.
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// The admissions workbook.
    #[clap(short, long)]
    input: Option<PathBuf>,
    /// The sheet to read (defaults to the year).
    #[clap(short, long)]
    sheet: Option<String>,
    /// The year the report covers.
    #[clap(short, long)]
    year: Option<i32>,
    /// Directory to write `report.html` and `summary.json` to.
    #[clap(short, long)]
    output: Option<PathBuf>,
    #[clap(long)]
    title: Option<String>,
    /// Show this many rows of the normalized sheet before the report.
    #[clap(long)]
    preview: Option<usize>,
}

impl Opt {
    fn config(&self) -> Result<ReportConfig> {
        let mut config = ReportConfig::load_or_default(self.config.as_deref())?;
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(sheet) = &self.sheet {
            config.sheet = Some(sheet.clone());
        }
        if let Some(year) = self.year {
            config.year = year;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        Ok(config)
    }
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = opt.config()?;
    let records = Records::load(&config.input, &config.sheet_name())?;

    if let Some(count) = opt.preview {
        header("Normalized sheet");
        println!("{}", records.term_table(count));
    }

    let report = Report::build(&records, &config);
    render::print_report(&report);
    let path = render::write(&report, &config.output)?;
    println!("\nreport written to {}", path.display());
    Ok(())
}
