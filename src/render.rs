//! Turn a [`Report`] into an HTML document, terminal tables and a JSON summary.
use crate::{
    report::{month_label, Body, CountTable, MonthlySeries, NumericSummary, Report, Section},
    util::{header, path_exists, HtmlTable},
    Result,
};
use anyhow::Context;
use qu::ick_use::*;
use std::{
    fmt::Write,
    fs,
    path::{Path, PathBuf},
};
use term_data_table::{Cell, Row, Table};

pub const HTML_FILE: &str = "report.html";
pub const JSON_FILE: &str = "summary.json";
pub const NO_DATA: &str = "no data";

const STYLE: &str = "\
body { font-family: sans-serif; max-width: 60em; margin: 2em auto; color: #222; }
table { border-collapse: collapse; margin: 1em 0; }
td, th { border: 1px solid #bbb; padding: 0.25em 0.75em; text-align: left; }
caption { text-align: left; font-style: italic; }
.no-data, .note { color: #777; font-style: italic; }
";

fn fmt_num(n: f64) -> String {
    format!("{:.1}", n)
}

fn summary_rows(summary: &NumericSummary) -> [(&'static str, String); 7] {
    [
        ("n", summary.n.to_string()),
        ("mean", fmt_num(summary.mean)),
        ("median", fmt_num(summary.median)),
        ("lower quartile", fmt_num(summary.lower_quartile)),
        ("upper quartile", fmt_num(summary.upper_quartile)),
        ("min", fmt_num(summary.min)),
        ("max", fmt_num(summary.max)),
    ]
}

fn count_html(table: &CountTable) -> HtmlTable {
    let mut html = HtmlTable::new([table.category.clone(), "Count".into(), "%".into()])
        .with_caption(format!("n = {}", table.total));
    for row in table.rows.iter() {
        html.add_row((&row.label, row.count, fmt_num(row.percent)));
    }
    html
}

fn escaped(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// The whole report as a standalone HTML document.
pub fn html(report: &Report) -> String {
    let title = escaped(&report.title);
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>\n{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n\
         <p>Year {}</p>\n",
        report.year,
        title = title,
        STYLE = STYLE,
    );
    for section in report.sections.iter() {
        section_html(section, &mut out);
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn section_html(section: &Section, out: &mut String) {
    let _ = writeln!(out, "<section>\n<h2>{}</h2>", escaped(&section.title));
    for body in section.body.iter() {
        match body {
            Body::KeyValues { rows } => {
                let mut table = HtmlTable::new(Vec::<&'static str>::new());
                for (key, value) in rows {
                    table.add_row((key, value));
                }
                table.write_to(out);
            }
            Body::Counts(counts) => count_html(counts).write_to(out),
            Body::Numeric { unit, summary } => match summary {
                Some(summary) => {
                    let mut table =
                        HtmlTable::new(["Statistic", "Value"]).with_caption(format!("in {}", unit));
                    for row in summary_rows(summary) {
                        table.add_row(row);
                    }
                    table.write_to(out);
                }
                None => no_data(out),
            },
            Body::Chart(series) => match svg_chart(series) {
                Some(svg) => {
                    out.push_str(&svg);
                    out.push('\n');
                }
                None => no_data(out),
            },
            Body::Unavailable { reason } => {
                let _ = writeln!(out, "<p class=\"note\">{}</p>", escaped(reason));
            }
        }
    }
    out.push_str("</section>\n");
}

fn no_data(out: &mut String) {
    let _ = writeln!(out, "<p class=\"no-data\">{}</p>", NO_DATA);
}

const CHART_WIDTH: f64 = 720.;
const CHART_HEIGHT: f64 = 320.;
const MARGIN: f64 = 40.;

/// A line chart with a point per month, or `None` when there's nothing to plot.
pub fn svg_chart(series: &MonthlySeries) -> Option<String> {
    if series.is_empty() {
        return None;
    }
    let max = series
        .points
        .iter()
        .map(|(_, count)| *count)
        .max()
        .unwrap_or(1)
        .max(1) as f64;
    let plot_width = CHART_WIDTH - 2. * MARGIN;
    let plot_height = CHART_HEIGHT - 2. * MARGIN;
    let step = if series.points.len() > 1 {
        plot_width / (series.points.len() - 1) as f64
    } else {
        0.
    };
    let coords: Vec<(f64, f64)> = series
        .points
        .iter()
        .enumerate()
        .map(|(idx, (_, count))| {
            (
                MARGIN + idx as f64 * step,
                CHART_HEIGHT - MARGIN - *count as f64 / max * plot_height,
            )
        })
        .collect();

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" \
         viewBox=\"0 0 {w} {h}\" role=\"img\">",
        w = CHART_WIDTH,
        h = CHART_HEIGHT
    );
    // axes
    let _ = write!(
        svg,
        "<line x1=\"{m}\" y1=\"{b}\" x2=\"{r}\" y2=\"{b}\" stroke=\"#444\"/>\
         <line x1=\"{m}\" y1=\"{m}\" x2=\"{m}\" y2=\"{b}\" stroke=\"#444\"/>\
         <text x=\"{lx}\" y=\"{b}\" font-size=\"11\" text-anchor=\"end\">0</text>\
         <text x=\"{lx}\" y=\"{ty}\" font-size=\"11\" text-anchor=\"end\">{max}</text>",
        m = MARGIN,
        b = CHART_HEIGHT - MARGIN,
        r = CHART_WIDTH - MARGIN,
        lx = MARGIN - 6.,
        ty = MARGIN + 4.,
        max = max
    );
    let points = coords
        .iter()
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = write!(
        svg,
        "<polyline fill=\"none\" stroke=\"#1f77b4\" stroke-width=\"2\" points=\"{}\"/>",
        points
    );
    for ((x, y), (month, count)) in coords.iter().zip(series.points.iter()) {
        let label = month_label(*month);
        let _ = write!(
            svg,
            "<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"4\" fill=\"#1f77b4\">\
             <title>{label}: {count}</title></circle>\
             <text x=\"{x:.1}\" y=\"{ly:.1}\" font-size=\"10\" text-anchor=\"middle\">{label}</text>",
            x = x,
            y = y,
            ly = CHART_HEIGHT - MARGIN + 16.,
            label = label,
            count = count
        );
    }
    svg.push_str("</svg>");
    Some(svg)
}

/// Terminal rendering of one block, `None` for blocks that are only text.
pub fn term_table(body: &Body) -> Option<Table<'static>> {
    match body {
        Body::KeyValues { rows } => Some(rows.iter().fold(Table::new(), |table, (key, value)| {
            table.with_row(
                Row::new()
                    .with_cell(Cell::from(key.clone()))
                    .with_cell(Cell::from(value.clone())),
            )
        })),
        Body::Counts(counts) => {
            let mut table = Table::new().with_row(
                Row::new()
                    .with_cell(Cell::from(counts.category.clone()))
                    .with_cell(Cell::from("Count"))
                    .with_cell(Cell::from("Percentage")),
            );
            for row in counts.rows.iter() {
                table.add_row(
                    Row::new()
                        .with_cell(Cell::from(row.label.clone()))
                        .with_cell(Cell::from(row.count.to_string()))
                        .with_cell(Cell::from(format!("{:.1}%", row.percent))),
                );
            }
            Some(table)
        }
        Body::Numeric {
            summary: Some(summary),
            unit,
        } => {
            let mut table = Table::new().with_row(
                Row::new()
                    .with_cell(Cell::from("Statistic"))
                    .with_cell(Cell::from(format!("Value ({})", unit))),
            );
            for (stat, value) in summary_rows(summary) {
                table.add_row(
                    Row::new()
                        .with_cell(Cell::from(stat))
                        .with_cell(Cell::from(value)),
                );
            }
            Some(table)
        }
        Body::Numeric { summary: None, .. } | Body::Chart(_) | Body::Unavailable { .. } => None,
    }
}

/// Echo every section to stdout.
pub fn print_report(report: &Report) {
    header(&report.title);
    for section in report.sections.iter() {
        header(&section.title);
        for body in section.body.iter() {
            match term_table(body) {
                Some(table) => println!("{}", table),
                None => match body {
                    Body::Unavailable { reason } => println!("({})", reason),
                    Body::Chart(series) if !series.is_empty() => {
                        println!("(chart in {})", HTML_FILE)
                    }
                    _ => println!("({})", NO_DATA),
                },
            }
        }
    }
}

/// Write `report.html` and `summary.json` into `dir`, creating it if needed.
///
/// Existing files are replaced. Returns the path of the HTML document.
pub fn write(report: &Report, dir: impl AsRef<Path>) -> Result<PathBuf> {
    fn write_file(path: &Path, contents: &str) -> Result {
        if path_exists(path)? {
            event!(Level::WARN, "overwriting \"{}\"", path.display());
        }
        fs::write(path, contents)?;
        Ok(())
    }
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory \"{}\"", dir.display()))?;

    let html_path = dir.join(HTML_FILE);
    write_file(&html_path, &html(report))
        .with_context(|| format!("writing \"{}\"", html_path.display()))?;

    let json_path = dir.join(JSON_FILE);
    let json = serde_json::to_string_pretty(report)?;
    write_file(&json_path, &json).with_context(|| format!("writing \"{}\"", json_path.display()))?;

    event!(
        Level::INFO,
        "wrote \"{}\" and \"{}\"",
        html_path.display(),
        json_path.display()
    );
    Ok(html_path)
}
