//! Operation queue store.
//!
//! An ordered list of pending row mutations plus a two-state status flag,
//! scoped to one project/connection. The store is an owned object with an
//! explicit reset point ([`OperationQueueStore::switch_scope`]) rather than
//! ambient global state; hosts keep one per open editor.
//!
//! ## Save epochs
//!
//! Every group removal (`clear`, cancel, scope switch) starts a new epoch.
//! A save captures the epoch when it begins; when it finishes in a later
//! epoch it is stale and must not touch the queue, because the operations it
//! submitted are no longer the ones at the head of the list.
//!
//! ## Save guard
//!
//! The guard that keeps a second save from starting is the in-flight save
//! id, not the visible status. Cancel and scope switches report `idle` at
//! once, but the guard stays up until the abandoned submission resolves.
//! Every completion releases the guard, stale or not.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::operation::{NewOperation, OperationId, QueuedOperation};

/// The project and connection a queue belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectScope {
    pub project_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
}

impl ProjectScope {
    pub fn new(project_ref: impl Into<String>) -> Self {
        Self {
            project_ref: project_ref.into(),
            connection_id: None,
        }
    }

    pub fn with_connection(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    #[default]
    Idle,
    Saving,
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationQueueState {
    pub status: QueueStatus,
    pub operations: Vec<QueuedOperation>,
}

/// Why a save request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySaving,
    EmptyQueue,
}

/// A save in flight: what was submitted, for which scope, in which epoch.
#[derive(Debug, Clone)]
pub(crate) struct SaveTicket {
    save_id: u64,
    epoch: u64,
    pub(crate) scope: ProjectScope,
    pub(crate) operations: Vec<QueuedOperation>,
}

#[derive(Debug)]
struct StoreInner {
    scope: ProjectScope,
    epoch: u64,
    next_id: u64,
    next_save_id: u64,
    /// Id of the submission not yet resolved, if any.
    in_flight: Option<u64>,
    state: OperationQueueState,
}

impl StoreInner {
    fn reset(&mut self) -> Vec<QueuedOperation> {
        self.epoch += 1;
        self.state.status = QueueStatus::Idle;
        std::mem::take(&mut self.state.operations)
    }

    /// Release the guard held by `ticket` and go idle. Returns whether the
    /// ticket still belongs to the current epoch.
    fn finish(&mut self, ticket: &SaveTicket) -> bool {
        if self.in_flight == Some(ticket.save_id) {
            self.in_flight = None;
        }
        self.state.status = QueueStatus::Idle;
        self.epoch == ticket.epoch
    }
}

/// Thread-safe queue of pending row mutations.
#[derive(Debug)]
pub struct OperationQueueStore {
    inner: Mutex<StoreInner>,
}

impl OperationQueueStore {
    pub fn new(scope: ProjectScope) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                scope,
                epoch: 0,
                next_id: 1,
                next_save_id: 1,
                in_flight: None,
                state: OperationQueueState::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an operation. Never merges with earlier edits of the same row.
    pub fn enqueue(&self, op: NewOperation) -> OperationId {
        let mut inner = self.lock();
        let id = OperationId(inner.next_id);
        inner.next_id += 1;
        debug!(
            project_ref = %inner.scope.project_ref,
            %id,
            table_id = %op.table_id(),
            kind = ?op.kind(),
            "operation queued"
        );
        inner.state.operations.push(op.into_queued(id, Utc::now()));
        id
    }

    /// Remove every operation. The status is left as is; a save in flight
    /// still resolves and goes idle.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.state.operations.clear();
    }

    /// Overwrite the status flag.
    ///
    /// The save coordinator owns the status; this is for hosts restoring a
    /// queue and for tests. It only changes what [`status`](Self::status)
    /// reports: it never starts or ends a save, so neither a restored
    /// `Saving` nor an early `Idle` affects whether `save()` may run.
    pub fn set_status(&self, status: QueueStatus) {
        self.lock().state.status = status;
    }

    pub fn snapshot(&self) -> OperationQueueState {
        self.lock().state.clone()
    }

    pub fn status(&self) -> QueueStatus {
        self.lock().state.status
    }

    /// Whether a submitted save has not resolved yet. This is the guard
    /// `save()` checks, and it may outlive a `saving` status (see cancel).
    pub fn save_in_flight(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().state.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether there is anything to save.
    pub fn has_pending(&self) -> bool {
        !self.is_empty()
    }

    pub fn scope(&self) -> ProjectScope {
        self.lock().scope.clone()
    }

    /// Re-initialize for another project/connection: queue emptied, status
    /// reset. Returns `false` (and changes nothing) when `scope` is current.
    pub fn switch_scope(&self, scope: ProjectScope) -> bool {
        let mut inner = self.lock();
        if inner.scope == scope {
            return false;
        }
        let dropped = inner.reset();
        debug!(
            from = %inner.scope.project_ref,
            to = %scope.project_ref,
            dropped = dropped.len(),
            "operation queue re-initialized"
        );
        inner.scope = scope;
        true
    }

    // ── Save protocol (driven by the coordinator) ──────────────────────

    /// Check the guard and enter `saving` under one lock acquisition.
    pub(crate) fn begin_save(&self) -> Result<SaveTicket, SkipReason> {
        let mut inner = self.lock();
        if inner.in_flight.is_some() {
            return Err(SkipReason::AlreadySaving);
        }
        if inner.state.operations.is_empty() {
            return Err(SkipReason::EmptyQueue);
        }
        let save_id = inner.next_save_id;
        inner.next_save_id += 1;
        inner.in_flight = Some(save_id);
        inner.state.status = QueueStatus::Saving;
        Ok(SaveTicket {
            save_id,
            epoch: inner.epoch,
            scope: inner.scope.clone(),
            operations: inner.state.operations.clone(),
        })
    }

    /// Drop the submitted operations and go idle. Operations enqueued while
    /// the save was in flight stay queued. A stale ticket only releases the
    /// guard and returns `false`.
    pub(crate) fn complete_save(&self, ticket: &SaveTicket) -> bool {
        let mut inner = self.lock();
        if !inner.finish(ticket) {
            return false;
        }
        // Within one epoch operations are only appended, so the submitted
        // batch is still the head of the list.
        let submitted = ticket.operations.len().min(inner.state.operations.len());
        inner.state.operations.drain(..submitted);
        true
    }

    /// Go idle and keep every operation. Returns `false` for a stale ticket.
    pub(crate) fn abort_save(&self, ticket: &SaveTicket) -> bool {
        self.lock().finish(ticket)
    }

    /// Empty the queue and report idle, whatever the status. A save in
    /// flight keeps the guard until it resolves. Returns the scope and the
    /// removed operations.
    pub(crate) fn take_all(&self) -> (ProjectScope, Vec<QueuedOperation>) {
        let mut inner = self.lock();
        let operations = inner.reset();
        (inner.scope.clone(), operations)
    }
}
