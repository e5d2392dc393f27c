//! Cache invalidation interface.
//!
//! The read cache itself lives in the host application. The core only knows
//! which entities need touching; how that maps onto cache keys is up to the
//! [`InvalidationDispatcher`] implementation.
//!
//! Dispatcher failures are never retried here. A failed invalidation leaves
//! a stale entry behind, which the next refetch repairs.

use tracing::warn;

use crate::error::SyncError;
use crate::events::ChangeEvent;
use crate::queue::TableId;

/// Cache invalidation hooks implemented by the host application.
pub trait InvalidationDispatcher: Send + Sync {
    /// Mark cached reads affected by a classified SQL statement as stale.
    fn invalidate_entity(&self, event: &ChangeEvent) -> Result<(), SyncError>;

    /// Mark cached rows of a table as stale after a successful save.
    fn invalidate_table(&self, project_ref: &str, table_id: TableId) -> Result<(), SyncError>;

    /// Drop optimistic edits of a table and return to server truth.
    fn revert_table(&self, project_ref: &str, table_id: TableId) -> Result<(), SyncError>;
}

/// Forward aggregator output to the dispatcher, in order.
///
/// Returns the number of events whose invalidation failed.
pub fn dispatch_change_events(
    dispatcher: &dyn InvalidationDispatcher,
    events: &[ChangeEvent],
) -> usize {
    let mut failed = 0;
    for event in events {
        if let Err(e) = dispatcher.invalidate_entity(event) {
            warn!(
                project_ref = %event.project_ref,
                entity_type = %event.entity_type,
                entity_name = %event.entity_name,
                error = %e,
                "cache invalidation failed; entry stays stale"
            );
            failed += 1;
        }
    }
    failed
}

/// What to do with a table's cached rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableAction {
    /// The server changed; refetch.
    Invalidate,
    /// Nothing reached the server; discard optimistic edits.
    Revert,
}

/// Apply `action` to each table. Returns the number of failed calls.
pub(crate) fn touch_tables(
    dispatcher: &dyn InvalidationDispatcher,
    project_ref: &str,
    tables: &[TableId],
    action: TableAction,
) -> usize {
    let mut failed = 0;
    for &table_id in tables {
        let result = match action {
            TableAction::Invalidate => dispatcher.invalidate_table(project_ref, table_id),
            TableAction::Revert => dispatcher.revert_table(project_ref, table_id),
        };
        if let Err(e) = result {
            warn!(
                project_ref,
                %table_id,
                ?action,
                error = %e,
                "table cache update failed; entry stays stale"
            );
            failed += 1;
        }
    }
    failed
}
