use std::{
    borrow::Cow,
    fmt::{self, Write},
    fs, io,
    path::Path,
};

/// Converts a not found error to Ok(false)
pub fn path_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

pub struct RowDrawer<'a> {
    output: &'a mut String,
    scratch: &'a mut String,
}

impl<'a> RowDrawer<'a> {
    fn cell(&mut self, content: impl fmt::Display) {
        self.output.push_str("<td>");
        self.scratch.clear();
        let _ = write!(self.scratch, "{}", content);
        html_escape::encode_text_to_string(self.scratch.as_str(), self.output);
        self.output.push_str("</td>");
    }
}

/// Something that can be drawn as one row of an [`HtmlTable`].
pub trait RowForDisplay {
    fn draw(&self, drawer: RowDrawer<'_>);
}

macro_rules! row_for_display_tuple {
    () => {};

    ($first_ty:ident $($rest_ty:ident)*) => {
        impl<$first_ty, $($rest_ty,)*> RowForDisplay for ($first_ty, $($rest_ty),*)
            where $first_ty: ::std::fmt::Display,
                  $(
                      $rest_ty: ::std::fmt::Display,
                  )*
        {
            fn draw(&self, mut drawer: RowDrawer<'_>) {
                #[allow(non_snake_case)]
                let (
                    ref $first_ty,
                    $(
                        ref $rest_ty
                    ),*
                ) = &self;
                drawer.cell($first_ty);
                $(
                    drawer.cell($rest_ty);
                )*
            }
        }

        row_for_display_tuple!($($rest_ty)*);
    };
}

row_for_display_tuple!(D1 D2 D3 D4);

/// An HTML `<table>` built up row by row. Every cell is escaped.
pub struct HtmlTable {
    caption: Option<Cow<'static, str>>,
    headers: Vec<Cow<'static, str>>,
    body: String,
    scratch: String,
}

impl HtmlTable {
    pub fn new(headers: impl IntoIterator<Item = impl Into<Cow<'static, str>>>) -> Self {
        HtmlTable {
            caption: None,
            headers: headers.into_iter().map(Into::into).collect(),
            body: String::new(),
            scratch: String::new(),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<Cow<'static, str>>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn add_row(&mut self, row: impl RowForDisplay) {
        self.body.push_str("<tr>");
        row.draw(RowDrawer {
            output: &mut self.body,
            scratch: &mut self.scratch,
        });
        self.body.push_str("</tr>\n");
    }

    /// Append the finished table to `output`.
    pub fn write_to(&self, output: &mut String) {
        output.push_str("<table>\n");
        if let Some(caption) = &self.caption {
            output.push_str("<caption>");
            html_escape::encode_text_to_string(caption, output);
            output.push_str("</caption>\n");
        }
        if !self.headers.is_empty() {
            output.push_str("<thead><tr>");
            for header in self.headers.iter() {
                output.push_str("<th>");
                html_escape::encode_text_to_string(header, output);
                output.push_str("</th>");
            }
            output.push_str("</tr></thead>\n");
        }
        output.push_str("<tbody>\n");
        output.push_str(&self.body);
        output.push_str("</tbody>\n</table>\n");
    }
}

pub fn header(header: &str) {
    let len = header.chars().count();
    print!("\n{}\n", header);
    for _ in 0..len {
        print!("=");
    }
    println!("\n")
}

#[cfg(test)]
mod test {
    use super::{path_exists, HtmlTable};
    use std::path::Path;

    #[test]
    fn cells_are_escaped() {
        let mut table = HtmlTable::new(["Sex", "Count"]).with_caption("a <b>");
        table.add_row(("M & F", 3));
        table.add_row(("<x>", "y"));
        let mut out = String::new();
        table.write_to(&mut out);
        assert!(out.contains("<caption>a &lt;b&gt;</caption>"));
        assert!(out.contains("<th>Sex</th><th>Count</th>"));
        assert!(out.contains("<tr><td>M &amp; F</td><td>3</td></tr>"));
        assert!(out.contains("<td>&lt;x&gt;</td>"));
    }

    #[test]
    fn headerless_table() {
        let mut out = String::new();
        HtmlTable::new(Vec::<&'static str>::new()).write_to(&mut out);
        assert!(!out.contains("<thead>"));
        assert!(out.contains("<tbody>"));
    }

    #[test]
    fn missing_paths() {
        assert!(!path_exists(Path::new("surely/not/here")).unwrap());
        assert!(path_exists(Path::new("Cargo.toml")).unwrap());
    }
}
