//! Statement tokenizer for `entries` table dump lines.
//!
//! A dump is a sequence of SQL statements, one per line. Only lines that
//! begin with `INSERT INTO` carry data; everything else (DDL, comments,
//! lock statements) is ignored. The value list after the ` VALUES `
//! delimiter is split into comma-separated fields where a single quote
//! opens a literal run and a backslash escapes the following character.
//! Doubled quotes are not an escape.
//!
//! The tokenizer is deliberately flat: it does not track parenthesis
//! nesting, so the row boundaries of a multi-row INSERT are recovered
//! later by [`crate::rows::group_rows`].

use crate::error::ParseError;

/// Statement prefix that marks a data-bearing line.
pub const INSERT_PREFIX: &str = "INSERT INTO";

/// Delimiter between the insert target and the value list.
pub const VALUES_DELIMITER: &str = " VALUES ";

/// One scalar field extracted from a value list.
///
/// An empty field and the bare token `NULL` both normalize to
/// [`FieldValue::Null`]; downstream code must treat it as a sentinel for
/// absence, never as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Null,
}

impl FieldValue {
    /// Normalize a raw field into a value, mapping the NULL encodings.
    pub fn from_raw(raw: String) -> Self {
        if raw.is_empty() || raw == "NULL" {
            FieldValue::Null
        } else {
            FieldValue::Text(raw)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Null => None,
        }
    }
}

/// Tokenize one dump line into an ordered field sequence.
///
/// Returns an empty vector for lines that are not data-bearing INSERT
/// statements; that is the common case in a dump and not an error. A
/// quoted literal left open at the end of the line (or a trailing
/// backslash) fails the whole line: emitting the partial tokens would
/// silently shift column alignment for every row that follows.
pub fn tokenize_line(line: &str) -> Result<Vec<FieldValue>, ParseError> {
    if !line.starts_with(INSERT_PREFIX) {
        return Ok(Vec::new());
    }
    let values = match line.find(VALUES_DELIMITER) {
        Some(at) => &line[at + VALUES_DELIMITER.len()..],
        None => return Ok(Vec::new()),
    };
    if !values.starts_with('(') {
        return Ok(Vec::new());
    }
    let base = line.len() - values.len();

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut quote_start = 0;

    for (at, c) in values.char_indices() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '\'' {
            if !in_quotes {
                quote_start = base + at;
            }
            in_quotes = !in_quotes;
        } else if c == ',' && !in_quotes {
            fields.push(FieldValue::from_raw(std::mem::take(&mut current)));
        } else {
            current.push(c);
        }
    }

    if in_quotes {
        return Err(ParseError::UnterminatedQuote { pos: quote_start });
    }
    if escaped {
        return Err(ParseError::DanglingEscape);
    }
    fields.push(FieldValue::from_raw(current));
    Ok(fields)
}
