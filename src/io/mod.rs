//! Reference-file I/O.
//!
//! Files are whitespace-separated token streams; `#` starts a comment that
//! runs to end of line. Leading comment lines form the file header and are
//! preserved on write. Numbers are kept as the decimal strings found in the
//! file so a reader can parse them at any precision it likes.

mod testfile;

pub use testfile::{
    read_boys_file, read_integral_file, read_single_file, write_boys_file, write_integral_file,
    write_single_file, BoysEntry, BoysFile, IntegralEntry, IntegralFile, SingleEntry, SingleFile,
};

use crate::error::RefintError;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use std::path::Path;

/// A file split into header comment lines and a stream of tokens.
pub(crate) struct TokenReader {
    header: String,
    tokens: Vec<String>,
    pos: usize,
}

impl TokenReader {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read {}", path.display()))?;

        let mut header = String::new();
        let mut tokens = Vec::new();
        let mut in_header = true;
        for line in text.lines() {
            let trimmed = line.trim_start();
            if in_header {
                if let Some(rest) = trimmed.strip_prefix('#') {
                    header.push_str(rest.trim());
                    header.push('\n');
                    continue;
                }
                in_header = false;
            }
            let data = match line.find('#') {
                Some(i) => &line[..i],
                None => line,
            };
            tokens.extend(data.split_whitespace().map(str::to_string));
        }
        Ok(TokenReader {
            header,
            tokens,
            pos: 0,
        })
    }

    pub(crate) fn header(&self) -> &str {
        &self.header
    }

    pub(crate) fn next(&mut self) -> Result<String> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| RefintError::MalformedFile("unexpected end of file".into()))?;
        self.pos += 1;
        Ok(tok)
    }

    pub(crate) fn next_parsed<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let tok = self.next()?;
        tok.parse::<T>().map_err(|_| {
            RefintError::MalformedFile(format!("bad {} \"{}\"", what, tok)).into()
        })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Write `contents` via a temporary file and rename, so readers never see
/// a half-written reference file.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)
        .wrap_err_with(|| format!("cannot write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .wrap_err_with(|| format!("cannot rename {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Format a header as comment lines.
pub(crate) fn format_header(out: &mut String, header: &str) {
    for line in header.lines() {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
}
