//! Byte-level lexical helpers shared by the splitter and the classifier.
//!
//! Everything here scans `&[u8]`. The only bytes that carry meaning
//! (quotes, `$`, `-`, `/`, `*`, `;`, `.`, `(`) are ASCII, and every byte of
//! a multi-byte UTF-8 sequence is `>= 0x80`, so offsets produced by these
//! helpers are always valid `str` slice boundaries.
//!
//! Recognized regions that hide their contents from statement splitting and
//! keyword matching:
//!
//! | Region            | Opener            | Closer          | Escapes           |
//! |-------------------|-------------------|-----------------|-------------------|
//! | string literal    | `'`               | `'`             | `''`, `\` in `E''` |
//! | quoted identifier | `"`               | `"`             | `""`              |
//! | dollar-quoted     | `$$` / `$tag$`    | same delimiter  | none              |
//! | line comment      | `--`              | newline         | none              |
//! | block comment     | `/*`              | `*/`            | nests             |

use std::fmt;

use crate::error::SyncError;

/// A region of SQL text whose contents are opaque to the scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Region {
    SingleQuoted,
    DoubleQuoted,
    /// Dollar-quoted body; the payload is the delimiter length in bytes
    /// (2 for `$$`, 5 for `$fn$`).
    DollarQuoted(usize),
    LineComment,
    BlockComment,
}

/// First byte of an unquoted identifier.
pub(crate) fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

/// Any byte of an unquoted identifier after the first.
pub(crate) fn is_ident_byte(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit() || b == b'$'
}

/// Detect a region opening at byte `i`.
pub(crate) fn region_at(bytes: &[u8], i: usize) -> Option<Region> {
    match bytes[i] {
        b'\'' => Some(Region::SingleQuoted),
        b'"' => Some(Region::DoubleQuoted),
        b'$' => dollar_tag_len(bytes, i).map(Region::DollarQuoted),
        b'-' if bytes.get(i + 1) == Some(&b'-') => Some(Region::LineComment),
        b'/' if bytes.get(i + 1) == Some(&b'*') => Some(Region::BlockComment),
        _ => None,
    }
}

/// Byte offset just past the end of `region`, which opens at `i`.
///
/// Returns `None` when the region is not terminated before end of input.
/// A line comment is always terminated (by newline or end of input).
pub(crate) fn region_end(bytes: &[u8], i: usize, region: Region) -> Option<usize> {
    match region {
        Region::SingleQuoted => skip_quoted(bytes, i, b'\'', is_escape_string(bytes, i)),
        Region::DoubleQuoted => skip_quoted(bytes, i, b'"', false),
        Region::DollarQuoted(tag_len) => {
            let tag = &bytes[i..i + tag_len];
            let body = i + tag_len;
            bytes[body..]
                .windows(tag_len)
                .position(|w| w == tag)
                .map(|p| body + p + tag_len)
        }
        Region::LineComment => Some(
            bytes[i..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |p| i + p + 1),
        ),
        Region::BlockComment => skip_block_comment(bytes, i),
    }
}

/// Length of the dollar-quote delimiter starting at `i` (`$$` or `$tag$`).
///
/// Positional parameters (`$1`) and `$` inside an identifier (`a$b`) are not
/// delimiters.
fn dollar_tag_len(bytes: &[u8], i: usize) -> Option<usize> {
    if i > 0 && is_ident_byte(bytes[i - 1]) {
        return None;
    }
    let mut j = i + 1;
    match bytes.get(j) {
        Some(b'$') => return Some(2),
        Some(&b) if is_ident_start(b) => j += 1,
        _ => return None,
    }
    while let Some(&b) = bytes.get(j) {
        if b == b'$' {
            return Some(j - i + 1);
        }
        if !(is_ident_start(b) || b.is_ascii_digit()) {
            return None;
        }
        j += 1;
    }
    None
}

/// Whether the `'` at `i` opens an `E'...'` escape string.
fn is_escape_string(bytes: &[u8], i: usize) -> bool {
    i >= 1
        && matches!(bytes[i - 1], b'e' | b'E')
        && (i < 2 || !is_ident_byte(bytes[i - 2]))
}

/// Skip a quoted region where a doubled quote is an escaped quote.
fn skip_quoted(bytes: &[u8], i: usize, quote: u8, backslash_escapes: bool) -> Option<usize> {
    let mut j = i + 1;
    while j < bytes.len() {
        let b = bytes[j];
        if backslash_escapes && b == b'\\' {
            j += 2;
            continue;
        }
        if b == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return Some(j + 1);
        }
        j += 1;
    }
    None
}

/// Skip a (possibly nested) `/* ... */` comment.
fn skip_block_comment(bytes: &[u8], i: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut j = i;
    while j + 1 < bytes.len() {
        match (bytes[j], bytes[j + 1]) {
            (b'/', b'*') => {
                depth += 1;
                j += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                j += 2;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => j += 1,
        }
    }
    None
}

/// Whether `sql` contains anything besides whitespace and comments.
pub(crate) fn has_content(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        match region_at(bytes, i) {
            Some(region @ (Region::LineComment | Region::BlockComment)) => {
                match region_end(bytes, i, region) {
                    Some(end) => i = end,
                    None => return false,
                }
            }
            _ => return true,
        }
    }
    false
}

// ── Tokens ─────────────────────────────────────────────────────────────────

/// A lexical token of a single statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Unquoted keyword or identifier, original case.
    Word(&'a str),
    /// Double-quoted identifier with `""` unescaped.
    QuotedIdent(String),
    /// String, dollar-quoted or numeric literal. Contents are never inspected.
    Literal,
    /// Any other single ASCII byte.
    Punct(u8),
}

impl Token<'_> {
    /// Case-insensitive keyword match. Quoted identifiers never match.
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    /// Identifier match following Postgres folding rules: unquoted names
    /// compare case-insensitively, quoted names exactly.
    pub(crate) fn is_ident(&self, lower_name: &str) -> bool {
        match self {
            Token::Word(w) => w.eq_ignore_ascii_case(lower_name),
            Token::QuotedIdent(s) => s == lower_name,
            _ => false,
        }
    }

    pub(crate) fn is_punct(&self, p: u8) -> bool {
        matches!(self, Token::Punct(b) if *b == p)
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "'{w}'"),
            Token::QuotedIdent(s) => write!(f, "\"{s}\""),
            Token::Literal => write!(f, "literal"),
            Token::Punct(b) => write!(f, "'{}'", *b as char),
        }
    }
}

/// Split one statement into tokens, dropping whitespace and comments.
///
/// Unterminated string literals, dollar-quoted bodies and block comments
/// run to end of input (best effort). An unterminated or empty quoted
/// identifier is an error, since no name can be trusted from it.
pub(crate) fn tokenize(sql: &str) -> Result<Vec<Token<'_>>, SyncError> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        // E'...' escape string: the prefix belongs to the literal.
        if matches!(b, b'e' | b'E') && bytes.get(i + 1) == Some(&b'\'') && !prev_is_ident(bytes, i)
        {
            i = region_end(bytes, i + 1, Region::SingleQuoted).unwrap_or(bytes.len());
            tokens.push(Token::Literal);
            continue;
        }

        if let Some(region) = region_at(bytes, i) {
            let end = region_end(bytes, i, region);
            match region {
                Region::DoubleQuoted => {
                    let end = end.ok_or_else(|| {
                        SyncError::MalformedStatement("unterminated quoted identifier".into())
                    })?;
                    let ident = sql[i + 1..end - 1].replace("\"\"", "\"");
                    if ident.is_empty() {
                        return Err(SyncError::MalformedStatement(
                            "zero-length quoted identifier".into(),
                        ));
                    }
                    tokens.push(Token::QuotedIdent(ident));
                    i = end;
                }
                Region::SingleQuoted | Region::DollarQuoted(_) => {
                    tokens.push(Token::Literal);
                    i = end.unwrap_or(bytes.len());
                }
                Region::LineComment | Region::BlockComment => {
                    i = end.unwrap_or(bytes.len());
                }
            }
            continue;
        }

        if is_ident_start(b) {
            let start = i;
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            tokens.push(Token::Word(&sql[start..i]));
        } else if b.is_ascii_digit() {
            while i < bytes.len() && (is_ident_byte(bytes[i]) || bytes[i] == b'.') {
                i += 1;
            }
            tokens.push(Token::Literal);
        } else {
            tokens.push(Token::Punct(b));
            i += 1;
        }
    }

    Ok(tokens)
}

fn prev_is_ident(bytes: &[u8], i: usize) -> bool {
    i > 0 && is_ident_byte(bytes[i - 1])
}
