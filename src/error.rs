//! Error types for pg_cache_sync.
//!
//! All errors that can occur within the crate are represented by [`SyncError`].
//! Errors are propagated via `Result<T, SyncError>` and only two boundaries
//! swallow them on purpose:
//!
//! - the event aggregator converts every classifier failure into "no event"
//!   (fail-open: a missed invalidation degrades to a stale read);
//! - the invalidation fan-out logs dispatcher failures and moves on.
//!
//! # Error Classification
//!
//! Errors are classified into five categories:
//! - **Parse**: a statement could not be classified. Local to one statement.
//! - **Save**: the batched mutation failed. The queue is preserved.
//! - **Cache**: an invalidation or revert call failed. Never retried.
//! - **Config**: invalid configuration.
//! - **Internal**: bugs.

use std::fmt;

/// Primary error type for the crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    // ── Parse errors: local to one statement ────────────────────────────
    /// The statement contains a token sequence the classifier cannot read
    /// (unterminated quoted identifier, empty identifier, ...).
    #[error("malformed statement: {0}")]
    MalformedStatement(String),

    /// The statement ends before the construct it started was complete
    /// (e.g. `CREATE TABLE` with nothing after it).
    #[error("incomplete statement: {0}")]
    IncompleteStatement(String),

    // ── Save errors: surfaced to the user, queue preserved ──────────────
    /// The server rejected the batched mutation.
    #[error("mutation rejected: {0}")]
    MutationRejected(String),

    /// The mutation could not be delivered (network, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    // ── Cache errors: degrade to a stale read ───────────────────────────
    /// A cache invalidation or revert call failed.
    #[error("cache invalidation failed: {0}")]
    InvalidationFailed(String),

    // ── Configuration ────────────────────────────────────────────────────
    /// The configuration could not be parsed or is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    // ── Internal errors: should not happen ──────────────────────────────
    /// An unexpected internal error. Indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether resubmitting the same batch unchanged may succeed.
    ///
    /// Only delivery failures qualify; a rejected batch needs the user to
    /// edit or cancel the queued operations first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }

    /// Whether this error must be shown to the user.
    ///
    /// Parse and cache errors are fail-open and only logged.
    pub fn is_user_visible(&self) -> bool {
        matches!(self.kind(), SyncErrorKind::Save | SyncErrorKind::Config)
    }
}

/// Classification of error kind for logging and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    Parse,
    Save,
    Cache,
    Config,
    Internal,
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncErrorKind::Parse => write!(f, "PARSE"),
            SyncErrorKind::Save => write!(f, "SAVE"),
            SyncErrorKind::Cache => write!(f, "CACHE"),
            SyncErrorKind::Config => write!(f, "CONFIG"),
            SyncErrorKind::Internal => write!(f, "INTERNAL"),
        }
    }
}

impl SyncError {
    /// Classify the error.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::MalformedStatement(_) | SyncError::IncompleteStatement(_) => {
                SyncErrorKind::Parse
            }

            SyncError::MutationRejected(_) | SyncError::Transport(_) => SyncErrorKind::Save,

            SyncError::InvalidationFailed(_) => SyncErrorKind::Cache,

            SyncError::Config(_) => SyncErrorKind::Config,

            SyncError::Internal(_) => SyncErrorKind::Internal,
        }
    }
}
