//! Statement classifier.
//!
//! Decides whether one statement may have changed a cached entity. The
//! classifier is deliberately shallow: it recognizes a closed set of
//! statement shapes by their leading tokens and gives up on everything else.
//!
//! | Leading tokens                                   | Effect                  |
//! |--------------------------------------------------|-------------------------|
//! | `CREATE [GLOBAL\|LOCAL] [TEMP\|TEMPORARY\|UNLOGGED] TABLE [IF NOT EXISTS] name` | table |
//! | `DROP TABLE [IF EXISTS] name`                    | table                   |
//! | `CREATE [OR REPLACE] FUNCTION name (`            | function                |
//! | `DROP FUNCTION [IF EXISTS] name`                 | function                |
//! | `SELECT ... cron.schedule(` / `cron.unschedule(` | cron                    |
//!
//! At most one effect is reported per statement: for DDL the first target,
//! for `SELECT` the first cron call.

use tracing::debug;

use super::lexer::{Token, tokenize};
use crate::error::SyncError;

/// A possibly schema-qualified object name, as written in the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    /// `None` when the statement did not qualify the name.
    pub schema: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        }
    }
}

/// The `pg_cron` call found in a `SELECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronAction {
    Schedule,
    Unschedule,
}

impl CronAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CronAction::Schedule => "schedule",
            CronAction::Unschedule => "unschedule",
        }
    }

    /// Map a `cron.*` function name to its action.
    fn from_function(token: &Token<'_>) -> Option<Self> {
        if token.is_ident("schedule") || token.is_ident("schedule_in_database") {
            Some(CronAction::Schedule)
        } else if token.is_ident("unschedule") {
            Some(CronAction::Unschedule)
        } else {
            None
        }
    }
}

/// What a recognized statement may have changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementEffect {
    Table(QualifiedName),
    Function(QualifiedName),
    Cron(CronAction),
}

/// Classify one statement. Unrecognized and malformed statements yield
/// `None`; malformed ones are logged at debug level.
pub fn classify(statement: &str) -> Option<StatementEffect> {
    match try_classify(statement) {
        Ok(effect) => effect,
        Err(e) => {
            debug!(error = %e, "statement not classified");
            None
        }
    }
}

/// Classify one statement, reporting why a recognized shape could not be
/// read. `Ok(None)` means the statement is simply not of interest.
pub fn try_classify(statement: &str) -> Result<Option<StatementEffect>, SyncError> {
    let tokens = tokenize(statement)?;
    let mut cur = Cursor::new(&tokens);

    let Some(verb) = cur.next() else {
        return Ok(None);
    };

    if verb.is_keyword("CREATE") {
        classify_create(&mut cur)
    } else if verb.is_keyword("DROP") {
        classify_drop(&mut cur)
    } else if verb.is_keyword("SELECT") {
        Ok(find_cron_call(&tokens[1..]).map(StatementEffect::Cron))
    } else {
        Ok(None)
    }
}

fn classify_create(cur: &mut Cursor<'_, '_>) -> Result<Option<StatementEffect>, SyncError> {
    let or_replace = cur.eat_keywords(&["OR", "REPLACE"]);
    let scoped = cur.eat_keyword("GLOBAL") || cur.eat_keyword("LOCAL");
    let persistence =
        cur.eat_keyword("TEMP") || cur.eat_keyword("TEMPORARY") || cur.eat_keyword("UNLOGGED");

    if cur.eat_keyword("TABLE") {
        if or_replace {
            return Ok(None);
        }
        cur.eat_keywords(&["IF", "NOT", "EXISTS"]);
        return cur.qualified_name("table name").map(|n| Some(StatementEffect::Table(n)));
    }

    if cur.eat_keyword("FUNCTION") {
        if scoped || persistence {
            return Ok(None);
        }
        return cur
            .qualified_name("function name")
            .map(|n| Some(StatementEffect::Function(n)));
    }

    Ok(None)
}

fn classify_drop(cur: &mut Cursor<'_, '_>) -> Result<Option<StatementEffect>, SyncError> {
    if cur.eat_keyword("TABLE") {
        cur.eat_keywords(&["IF", "EXISTS"]);
        return cur.qualified_name("table name").map(|n| Some(StatementEffect::Table(n)));
    }

    if cur.eat_keyword("FUNCTION") {
        cur.eat_keywords(&["IF", "EXISTS"]);
        return cur
            .qualified_name("function name")
            .map(|n| Some(StatementEffect::Function(n)));
    }

    Ok(None)
}

/// Find the first `cron.<action>(` call among `tokens`.
fn find_cron_call(tokens: &[Token<'_>]) -> Option<CronAction> {
    tokens.windows(4).find_map(|w| {
        if w[0].is_ident("cron") && w[1].is_punct(b'.') && w[3].is_punct(b'(') {
            CronAction::from_function(&w[2])
        } else {
            None
        }
    })
}

// ── Token cursor ───────────────────────────────────────────────────────────

struct Cursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'t, 'a> Cursor<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token<'a>> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the whole keyword sequence, or nothing.
    fn eat_keywords(&mut self, keywords: &[&str]) -> bool {
        let matched = keywords.iter().enumerate().all(|(k, kw)| {
            self.tokens
                .get(self.pos + k)
                .is_some_and(|t| t.is_keyword(kw))
        });
        if matched {
            self.pos += keywords.len();
        }
        matched
    }

    fn eat_punct(&mut self, p: u8) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(p)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String, SyncError> {
        match self.next() {
            Some(Token::Word(w)) => Ok((*w).to_string()),
            Some(Token::QuotedIdent(s)) => Ok(s.clone()),
            Some(other) => Err(SyncError::MalformedStatement(format!(
                "expected {what}, found {other}"
            ))),
            None => Err(SyncError::IncompleteStatement(format!("expected {what}"))),
        }
    }

    /// `name`, `schema.name`, or `catalog.schema.name` (catalog dropped).
    fn qualified_name(&mut self, what: &str) -> Result<QualifiedName, SyncError> {
        let mut schema = None;
        let mut name = self.identifier(what)?;
        while self.eat_punct(b'.') {
            schema = Some(std::mem::replace(&mut name, self.identifier(what)?));
        }
        Ok(QualifiedName { schema, name })
    }
}
