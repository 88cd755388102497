use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ascii_density::CharGrid;
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

/// Where `asciiArt` sends its result.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMethod {
    #[default]
    Console,
    Html,
}

impl FromStr for OutputMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console" => Ok(OutputMethod::Console),
            "html" => Ok(OutputMethod::Html),
            _ => Err(()),
        }
    }
}

pub fn render_console<W: Write>(art: &CharGrid, out: &mut W) -> io::Result<()> {
    write!(out, "{art}")
}

/// Writes art as a standalone HTML page in a monospace font.
#[derive(Clone, Debug)]
pub struct HtmlOutput {
    path: PathBuf,
    font: String,
}

impl HtmlOutput {
    pub fn new(path: impl Into<PathBuf>, font: impl Into<String>) -> Self {
        Self { path: path.into(), font: font.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file at [`path`](Self::path) with `art`.
    pub fn write(&self, art: &CharGrid) -> io::Result<()> {
        let mut file = BufWriter::new(File::create(&self.path)?);
        self.render(art, &mut file)?;
        file.flush()?;
        debug!("wrote {}x{} art to {}", art.width, art.height, self.path.display());
        Ok(())
    }

    pub fn render<W: Write>(&self, art: &CharGrid, out: &mut W) -> io::Result<()> {
        writeln!(out, "<!DOCTYPE html>")?;
        writeln!(out, "<html>")?;
        writeln!(out, "<head>")?;
        writeln!(out, "<meta charset=\"utf-8\">")?;
        writeln!(out, "<title>ASCII Art</title>")?;
        writeln!(out, "</head>")?;
        writeln!(out, "<body style=\"background-color:white;\">")?;
        writeln!(
            out,
            "<pre style=\"font-family:'{}', monospace; font-size:8px; line-height:1;\">",
            escape(&self.font)
        )?;
        for row in art.rows() {
            writeln!(out, "{}", escape(&row))?;
        }
        writeln!(out, "</pre>")?;
        writeln!(out, "</body>")?;
        writeln!(out, "</html>")
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn art() -> CharGrid {
        CharGrid::new(2, 2, vec!['<', '&', '@', ' '])
    }

    #[test]
    fn console_prints_one_line_per_row() {
        let mut out = Vec::new();
        render_console(&art(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<&\n@ \n");
    }

    #[test]
    fn html_escapes_markup_characters() {
        let mut out = Vec::new();
        HtmlOutput::new("unused.html", "Courier New").render(&art(), &mut out).unwrap();
        let html = String::from_utf8(out).unwrap();

        assert!(html.contains("&lt;&amp;\n@ \n</pre>"));
        assert!(html.contains("font-family:'Courier New'"));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn html_write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = HtmlOutput::new(dir.path().join("art.html"), "Courier New");
        std::fs::write(output.path(), "stale").unwrap();

        output.write(&art()).unwrap();
        let html = std::fs::read_to_string(output.path()).unwrap();
        assert!(!html.contains("stale"));
        assert!(html.contains("</html>"));
    }

    #[test]
    fn parses_output_names() {
        assert_eq!("html".parse::<OutputMethod>(), Ok(OutputMethod::Html));
        assert_eq!("console".parse::<OutputMethod>(), Ok(OutputMethod::Console));
        assert!("pdf".parse::<OutputMethod>().is_err());
    }
}
