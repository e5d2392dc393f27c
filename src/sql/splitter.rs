//! Statement splitter.
//!
//! Splits a SQL script on top-level `;` characters. Semicolons inside string
//! literals, quoted identifiers, dollar-quoted bodies and comments are not
//! separators (see [`lexer`](super::lexer) for the recognized regions).
//!
//! The splitter never fails: an unterminated region swallows the rest of the
//! input, which becomes the final statement.

use super::lexer::{self, region_at, region_end};

/// Split `sql` into top-level statements.
///
/// Returned slices are trimmed and borrow from `sql`. Fragments holding only
/// whitespace or comments are dropped.
pub fn split(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b';' {
            push_statement(&mut statements, &sql[start..i]);
            i += 1;
            start = i;
            continue;
        }
        match region_at(bytes, i) {
            Some(region) => match region_end(bytes, i, region) {
                Some(end) => i = end,
                // Unterminated: everything left belongs to the current statement.
                None => break,
            },
            None => i += 1,
        }
    }

    push_statement(&mut statements, &sql[start..]);
    statements
}

fn push_statement<'a>(statements: &mut Vec<&'a str>, fragment: &'a str) {
    let fragment = fragment.trim();
    if lexer::has_content(fragment) {
        statements.push(fragment);
    }
}
