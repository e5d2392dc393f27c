//! Queue save coordinator.
//!
//! Flushes the operation queue through one atomic server mutation and keeps
//! the read cache in step with the outcome:
//!
//! ```text
//!            save() [queue non-empty]
//!   idle ──────────────────────────────▶ saving
//!    ▲                                     │
//!    │  success: drop submitted ops,       │
//!    │           invalidate tables         │
//!    └──────────────────────────────────────┘
//!       failure: keep queue, surface error
//! ```
//!
//! `save()` while saving, or with an empty queue, is a no-op. `cancel()`
//! empties the queue and reverts optimistic edits without contacting the
//! server. There is no mid-flight cancellation of a save and no timeout at
//! this layer: a cancel during a save reports `idle` at once, but the next
//! save waits until the abandoned submission has resolved.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::operation::{QueuedOperation, TableId, distinct_table_ids};
use super::store::{OperationQueueStore, ProjectScope, SkipReason};
use crate::dispatch::{InvalidationDispatcher, TableAction, touch_tables};
use crate::error::SyncError;

/// Opaque role-impersonation context, forwarded to the server unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleToken(pub String);

/// The batched mutation sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    /// In enqueue order.
    pub operations: Vec<QueuedOperation>,
    pub scope: ProjectScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleToken>,
}

/// Delivers a [`SaveRequest`] as one all-or-nothing server call.
#[async_trait]
pub trait MutationTransport: Send + Sync {
    /// Return [`SyncError::MutationRejected`] when the server refused the
    /// batch and [`SyncError::Transport`] when it could not be reached.
    async fn submit(&self, request: SaveRequest) -> Result<(), SyncError>;
}

/// User-facing side effects of queue actions (toasts, the queue side panel).
pub trait QueueFeedback: Send + Sync {
    fn saved(&self, operations: usize);

    fn save_failed(&self, error: &SyncError);

    fn close_side_panel(&self) {}

    fn toggle_side_panel(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The batch was persisted and these tables were invalidated.
    Saved {
        operations: usize,
        tables: Vec<TableId>,
    },
    /// Nothing was sent.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    pub discarded: usize,
    /// Tables whose optimistic edits were reverted, in first-seen order.
    pub reverted_tables: Vec<TableId>,
}

/// Keyboard shortcuts bound to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueShortcut {
    Save,
    ToggleQueuePanel,
}

/// How the host should treat the key event after a shortcut was offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShortcutResponse {
    pub handled: bool,
    /// Keep the grid underneath from also handling the keystroke.
    pub stop_propagation: bool,
}

/// Serializes queue flushes; see the module docs for the state machine.
pub struct QueueSaveCoordinator {
    store: Arc<OperationQueueStore>,
    transport: Arc<dyn MutationTransport>,
    dispatcher: Arc<dyn InvalidationDispatcher>,
    feedback: Arc<dyn QueueFeedback>,
}

impl QueueSaveCoordinator {
    pub fn new(
        store: Arc<OperationQueueStore>,
        transport: Arc<dyn MutationTransport>,
        dispatcher: Arc<dyn InvalidationDispatcher>,
        feedback: Arc<dyn QueueFeedback>,
    ) -> Self {
        Self {
            store,
            transport,
            dispatcher,
            feedback,
        }
    }

    pub fn store(&self) -> &Arc<OperationQueueStore> {
        &self.store
    }

    /// Whether queue shortcuts should act right now: something is queued
    /// and no submission is outstanding.
    pub fn shortcuts_enabled(&self) -> bool {
        self.store.has_pending() && !self.store.save_in_flight()
    }

    /// Persist every queued operation in one server call.
    ///
    /// Returns `Ok(Skipped)` without contacting the server when a save is
    /// already running or the queue is empty. A failed call leaves the queue
    /// exactly as it was and returns the transport's error.
    pub async fn save(&self, role: Option<RoleToken>) -> Result<SaveOutcome, SyncError> {
        let ticket = match self.store.begin_save() {
            Ok(ticket) => ticket,
            Err(reason) => {
                debug!(?reason, "save skipped");
                return Ok(SaveOutcome::Skipped(reason));
            }
        };

        let project_ref = ticket.scope.project_ref.clone();
        let operations = ticket.operations.len();
        info!(%project_ref, operations, "saving queued operations");

        let request = SaveRequest {
            operations: ticket.operations.clone(),
            scope: ticket.scope.clone(),
            role,
        };

        match self.transport.submit(request).await {
            Ok(()) => {
                let tables = distinct_table_ids(&ticket.operations);
                if !self.store.complete_save(&ticket) {
                    warn!(%project_ref, "queue changed during save; leaving it untouched");
                }
                // The server changed whether or not the queue moved on.
                touch_tables(
                    self.dispatcher.as_ref(),
                    &project_ref,
                    &tables,
                    TableAction::Invalidate,
                );
                self.feedback.close_side_panel();
                self.feedback.saved(operations);
                info!(%project_ref, operations, tables = tables.len(), "queued operations saved");
                Ok(SaveOutcome::Saved { operations, tables })
            }
            Err(e) => {
                if !self.store.abort_save(&ticket) {
                    debug!(%project_ref, "queue changed during failed save");
                }
                warn!(%project_ref, operations, error = %e, "saving queued operations failed");
                self.feedback.save_failed(&e);
                Err(e)
            }
        }
    }

    /// Discard every queued operation and revert the affected tables.
    ///
    /// Works in any status and never contacts the server.
    pub fn cancel(&self) -> CancelOutcome {
        let (scope, operations) = self.store.take_all();
        let reverted_tables = distinct_table_ids(&operations);
        touch_tables(
            self.dispatcher.as_ref(),
            &scope.project_ref,
            &reverted_tables,
            TableAction::Revert,
        );
        info!(
            project_ref = %scope.project_ref,
            discarded = operations.len(),
            tables = reverted_tables.len(),
            "queued operations cancelled"
        );
        CancelOutcome {
            discarded: operations.len(),
            reverted_tables,
        }
    }

    /// Act on a keyboard shortcut if the queue has pending work and no save
    /// is running. A handled shortcut always stops propagation.
    pub async fn handle_shortcut(
        &self,
        shortcut: QueueShortcut,
        role: Option<RoleToken>,
    ) -> ShortcutResponse {
        if !self.shortcuts_enabled() {
            return ShortcutResponse::default();
        }

        match shortcut {
            QueueShortcut::Save => {
                // Failures were already reported through `QueueFeedback`.
                if let Err(e) = self.save(role).await {
                    debug!(error = %e, "shortcut save failed");
                }
            }
            QueueShortcut::ToggleQueuePanel => self.feedback.toggle_side_panel(),
        }

        ShortcutResponse {
            handled: true,
            stop_propagation: true,
        }
    }
}
