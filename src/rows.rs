//! Row reconstruction from the flat token stream of a multi-row INSERT.
//!
//! The tokenizer does not parse nested parentheses, so row boundaries are
//! recovered with a heuristic: a token that starts with `(` opens a row,
//! and a row is complete when the previously appended token ends with `)`
//! right as the next `(`-leading token arrives. The final row of a
//! statement is closed by the `);` terminator.
//!
//! The heuristic assumes a fixed field count per row and that no field's
//! content legitimately ends with a bare `)` at a comma boundary while its
//! successor starts with `(`. That assumption is inherited from the dump
//! format and is not verified here; if it is ever violated the grouping
//! silently shifts. Everything lives behind this one function so a real
//! recursive-descent parser could replace it without touching the rest of
//! the pipeline.

use crate::error::ParseError;
use crate::tokenize::FieldValue;

/// Strip `n` trailing characters from the last token of `current` and
/// re-normalize it, so a bare `NULL` or empty field uncovered by removing
/// a boundary parenthesis still becomes the NULL sentinel.
fn strip_suffix_from_last(current: &mut [FieldValue], n: usize) {
    if let Some(last) = current.last_mut() {
        if let FieldValue::Text(s) = last {
            let mut raw = std::mem::take(s);
            raw.truncate(raw.len() - n);
            *last = FieldValue::from_raw(raw);
        }
    }
}

fn emit(
    rows: &mut Vec<Vec<FieldValue>>,
    errors: &mut Vec<ParseError>,
    group: Vec<FieldValue>,
    arity: usize,
) {
    if group.len() == arity {
        rows.push(group);
    } else {
        errors.push(ParseError::RowShape {
            expected: arity,
            got: group.len(),
        });
    }
}

/// Split one statement's token stream into rows of exactly `arity` tokens.
///
/// Groups with any other length are reported as errors and discarded, never
/// padded or truncated; a trailing fragment that is not closed by `);` is
/// likewise discarded. Valid rows around a malformed one survive.
pub fn group_rows(
    tokens: Vec<FieldValue>,
    arity: usize,
) -> (Vec<Vec<FieldValue>>, Vec<ParseError>) {
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut current: Vec<FieldValue> = Vec::new();

    for mut token in tokens {
        let opens = matches!(&token, FieldValue::Text(s) if s.starts_with('('));
        if opens {
            let prev_closes =
                matches!(current.last(), Some(FieldValue::Text(s)) if s.ends_with(')'));
            if prev_closes {
                strip_suffix_from_last(&mut current, 1);
                emit(&mut rows, &mut errors, std::mem::take(&mut current), arity);
            }
            if current.is_empty() {
                if let FieldValue::Text(s) = token {
                    token = FieldValue::from_raw(s[1..].to_string());
                }
            }
        }
        current.push(token);
    }

    match current.last() {
        Some(FieldValue::Text(s)) if s.ends_with(");") => {
            strip_suffix_from_last(&mut current, 2);
            emit(&mut rows, &mut errors, current, arity);
        }
        Some(_) => {
            // Statement not closed by `);`: a truncated or garbled tail.
            errors.push(ParseError::RowShape {
                expected: arity,
                got: current.len(),
            });
        }
        None => {}
    }

    (rows, errors)
}
