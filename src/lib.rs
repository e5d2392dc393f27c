//! pg_cache_sync: keeps a client-side read cache consistent with a
//! PostgreSQL project.
//!
//! Two independent halves:
//!
//! - **SQL change events.** [`aggregator::parse_sql_statements`] splits an
//!   arbitrary SQL script, recognizes statements that create or drop tables
//!   and functions or (un)schedule `pg_cron` jobs, and returns one
//!   [`ChangeEvent`] per effect. The caller hands the events to an
//!   [`InvalidationDispatcher`] via [`dispatch::dispatch_change_events`].
//! - **Operation queue.** Grid edits are queued in an
//!   [`OperationQueueStore`] and persisted in one atomic call by the
//!   [`QueueSaveCoordinator`], which invalidates (after a save) or reverts
//!   (after a cancel) the affected tables.
//!
//! Neither half executes SQL or owns the cache. Both are fail-open with
//! respect to the cache: a missed invalidation is repaired by the next
//! refetch.

pub mod aggregator;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod queue;
pub mod sql;

pub use aggregator::{EventDebouncer, SqlEventParser, parse_sql_statements};
pub use config::SyncConfig;
pub use dispatch::{InvalidationDispatcher, dispatch_change_events};
pub use error::{SyncError, SyncErrorKind};
pub use events::{ChangeEvent, EntityType};
pub use queue::{
    MutationTransport, NewOperation, OperationQueueStore, ProjectScope, QueueFeedback,
    QueueSaveCoordinator, QueueStatus, TableId,
};
