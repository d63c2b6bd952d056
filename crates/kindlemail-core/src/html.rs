//! Plain-text to HTML conversion.
//!
//! Kindle's personal document service renders HTML better than raw text,
//! so `.txt` files are rewrapped as one paragraph per non-blank line.

use crate::charset::{gbk_to_utf8, is_gbk};
use crate::error::{Error, Result};
use crate::task::TaskLog;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HTML_HEADER: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta http-equiv=Content-Type content="text/html; charset=utf-8">
<style>
p { margin:0.3em -0.2em; padding:0em; text-indent:2em; line-height:1; }
</style>
</head>
<body>
"#;

const HTML_FOOTER: &str = "</body>\n</html>\n";

/// Result of [`convert`].
#[derive(Debug)]
pub enum Conversion {
    /// Not a text file; sent as-is.
    Unchanged(PathBuf),
    /// Text rendered to HTML in a private temporary directory, removed on drop.
    Html {
        /// Directory holding the generated file.
        dir: TempDir,
        /// Generated file.
        path: PathBuf,
    },
}

impl Conversion {
    /// Path of the file to attach.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Unchanged(path) | Self::Html { path, .. } => path,
        }
    }

    /// Returns true if an HTML file was generated.
    #[must_use]
    pub const fn is_converted(&self) -> bool {
        matches!(self, Self::Html { .. })
    }
}

/// Returns true if `path` has a `.txt` extension, in any case.
#[must_use]
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

/// Renders text as a minimal HTML document.
///
/// Every line is trimmed; blank lines are dropped and each remaining line
/// becomes one `<p>` element with `&`, `<` and `>` escaped.
#[must_use]
pub fn render_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + HTML_HEADER.len() + HTML_FOOTER.len());
    out.push_str(HTML_HEADER);
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "<p>{}</p>", escape(line));
    }
    out.push_str(HTML_FOOTER);
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Converts `path` to HTML if it is a text file.
///
/// GBK text is transcoded to UTF-8 first. The generated file is named after
/// the source's stem so the attachment keeps the book's name. The source is
/// never modified.
///
/// # Errors
///
/// Returns an error if the source cannot be read, GBK transcoding fails, or
/// the output cannot be written.
pub fn convert(path: &Path, log: &mut TaskLog) -> Result<Conversion> {
    if !is_text_file(path) {
        log.note("not a text file, sending as-is");
        return Ok(Conversion::Unchanged(path.to_path_buf()));
    }

    log.note(format!("converting {} to HTML", path.display()));
    let data = fs::read(path).map_err(|e| Error::io(path, e))?;

    let gbk = is_gbk(&data);
    log.note(format!("GBK encoded: {gbk}"));
    let text = if gbk {
        gbk_to_utf8(&data).ok_or_else(|| Error::Undecodable {
            path: path.to_path_buf(),
        })?
    } else {
        String::from_utf8_lossy(&data).into_owned()
    };

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = tempfile::Builder::new()
        .prefix("kindlemail-")
        .tempdir()
        .map_err(|e| Error::io(std::env::temp_dir(), e))?;
    let out = dir.path().join(format!("{stem}.html"));

    fs::write(&out, render_html(&text)).map_err(|e| Error::io(&out, e))?;
    log.note(format!("generated {}", out.display()));

    Ok(Conversion::Html { dir, path: out })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paragraphs(html: &str) -> Vec<&str> {
        html.lines()
            .filter_map(|l| l.strip_prefix("<p>"))
            .filter_map(|l| l.strip_suffix("</p>"))
            .collect()
    }

    #[test]
    fn test_render_paragraphs() {
        let html = render_html("  first line \r\n\r\n   \nsecond\n");
        assert_eq!(paragraphs(&html), vec!["first line", "second"]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("charset=utf-8"));
        assert!(html.contains("text-indent:2em"));
        assert!(!html.contains("<title>"));
        assert!(html.ends_with("</body>\n</html>\n"));
    }

    #[test]
    fn test_render_escapes_markup() {
        let html = render_html("x < y && y > z");
        assert_eq!(paragraphs(&html), vec!["x &lt; y &amp;&amp; y &gt; z"]);
    }

    #[test]
    fn test_text_extension_any_case() {
        assert!(is_text_file(Path::new("a.txt")));
        assert!(is_text_file(Path::new("dir/B.TXT")));
        assert!(!is_text_file(Path::new("c.pdf")));
        assert!(!is_text_file(Path::new("txt")));
    }

    #[test]
    fn test_non_text_unchanged() {
        let mut log = TaskLog::default();
        let conversion = convert(Path::new("book.pdf"), &mut log).unwrap();
        assert!(!conversion.is_converted());
        assert_eq!(conversion.path(), Path::new("book.pdf"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_convert_gbk_file() {
        let src = tempfile::tempdir().unwrap();
        let path = src.path().join("Novel.TXT");
        // "中文" in GBK, then an ASCII line
        fs::write(&path, [0xD6, 0xD0, 0xCE, 0xC4, b'\n', b'\n', b'o', b'k']).unwrap();

        let mut log = TaskLog::default();
        let conversion = convert(&path, &mut log).unwrap();
        assert!(conversion.is_converted());
        assert_eq!(conversion.path().file_name().unwrap(), "Novel.html");

        let html = fs::read_to_string(conversion.path()).unwrap();
        assert_eq!(paragraphs(&html), vec!["中文", "ok"]);
        assert!(log.iter().any(|l| l == "GBK encoded: true"));

        // source untouched, generated file removed with the conversion
        let generated = conversion.path().to_path_buf();
        drop(conversion);
        assert!(!generated.exists());
        assert!(path.exists());
    }

    #[test]
    fn test_convert_missing_file() {
        let mut log = TaskLog::default();
        let err = convert(Path::new("/no/such/book.txt"), &mut log).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    proptest! {
        #[test]
        fn one_paragraph_per_non_blank_line(lines in proptest::collection::vec("[ a-z\t]{0,12}", 0..20)) {
            let text = lines.join("\n");
            let html = render_html(&text);
            let expected: Vec<&str> = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
            let found = paragraphs(&html);
            prop_assert_eq!(found, expected);
            prop_assert!(!html.contains("<p></p>"));
        }
    }
}
