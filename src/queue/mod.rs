//! Pending row mutations and their batched save.
//!
//! [`OperationQueueStore`] holds the queue, [`QueueSaveCoordinator`] flushes
//! it through a [`MutationTransport`] and invalidates the affected tables.

pub mod coordinator;
pub mod operation;
pub mod store;

pub use coordinator::{
    CancelOutcome, MutationTransport, QueueFeedback, QueueSaveCoordinator, QueueShortcut,
    RoleToken, SaveOutcome, SaveRequest, ShortcutResponse,
};
pub use operation::{
    NewOperation, OperationId, OperationKind, QueuedOperation, TableId, distinct_table_ids,
};
pub use store::{OperationQueueState, OperationQueueStore, ProjectScope, QueueStatus, SkipReason};
