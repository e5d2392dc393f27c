//! Event aggregator: SQL script in, ordered change events out.
//!
//! [`parse_sql_statements`] is the entry point used by the SQL editor after a
//! query ran. It splits the script, classifies every statement and tags each
//! recognized effect with the caller's project ref.
//!
//! The aggregator is fail-open. It never returns an error and never panics
//! out: a statement it cannot read contributes no event, and a failure of
//! the whole pipeline yields an empty list. The cost of a missed event is a
//! stale cache entry until the next refetch.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::events::ChangeEvent;
use crate::sql;

/// Classify a SQL script with the default configuration.
///
/// Returns an empty list when `sql` or `project_ref` is empty.
pub async fn parse_sql_statements(sql: &str, project_ref: &str) -> Vec<ChangeEvent> {
    SqlEventParser::default().parse(sql, project_ref)
}

/// Configured aggregator.
#[derive(Debug, Clone)]
pub struct SqlEventParser {
    default_schema: String,
}

impl Default for SqlEventParser {
    fn default() -> Self {
        Self::new(&SyncConfig::default())
    }
}

impl SqlEventParser {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            default_schema: config.default_schema.clone(),
        }
    }

    /// Split, classify and tag. Never panics.
    pub fn parse(&self, sql: &str, project_ref: &str) -> Vec<ChangeEvent> {
        if sql.is_empty() || project_ref.is_empty() {
            return Vec::new();
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.collect(sql, project_ref))) {
            Ok(events) => events,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                let error = SyncError::Internal(format!("SQL event parsing panicked: {reason}"));
                warn!(
                    project_ref,
                    sql_len = sql.len(),
                    %error,
                    "SQL event parsing failed; no events emitted"
                );
                Vec::new()
            }
        }
    }

    fn collect(&self, sql: &str, project_ref: &str) -> Vec<ChangeEvent> {
        let events: Vec<ChangeEvent> = sql::split(sql)
            .into_iter()
            .filter_map(sql::classify)
            .map(|effect| ChangeEvent::from_effect(effect, project_ref, &self.default_schema))
            .collect();

        debug!(project_ref, events = events.len(), "classified SQL script");
        events
    }
}

// ── Debounce ───────────────────────────────────────────────────────────────

/// Last-edit-wins debounce in front of the aggregator.
///
/// Each [`submit`](Self::submit) supersedes every earlier one. A submission
/// resolves to `None` when a newer one arrived before its result was ready,
/// so callers can apply every `Some` they receive without further checks.
#[derive(Debug)]
pub struct EventDebouncer {
    parser: SqlEventParser,
    delay: Duration,
    generation: AtomicU64,
}

impl EventDebouncer {
    pub fn new(config: &SyncConfig) -> Self {
        Self::with_delay(SqlEventParser::new(config), config.debounce())
    }

    pub fn with_delay(parser: SqlEventParser, delay: Duration) -> Self {
        Self {
            parser,
            delay,
            generation: AtomicU64::new(0),
        }
    }

    /// Wait out the debounce delay, then classify `sql` unless a newer
    /// submission (or [`cancel_pending`](Self::cancel_pending)) superseded it.
    pub async fn submit(&self, sql: &str, project_ref: &str) -> Option<Vec<ChangeEvent>> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.delay).await;
        if !self.is_current(ticket) {
            debug!(ticket, "SQL classification superseded before start");
            return None;
        }

        let events = self.parser.parse(sql, project_ref);
        if !self.is_current(ticket) {
            debug!(ticket, "SQL classification superseded; result dropped");
            return None;
        }
        Some(events)
    }

    /// Supersede every submission still waiting or running.
    pub fn cancel_pending(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }
}
