//! Shared test doubles for integration tests.
//!
//! - [`RecordingDispatcher`] records every cache call in order.
//! - [`ScriptedTransport`] counts submissions and can be held open or told to
//!   fail, so tests can observe the queue while a save is in flight.
//! - [`RecordingFeedback`] records user-facing notifications.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pg_cache_sync::queue::{
    MutationTransport, OperationQueueStore, ProjectScope, QueueFeedback, QueueSaveCoordinator,
    SaveRequest, TableId,
};
use pg_cache_sync::{ChangeEvent, InvalidationDispatcher, SyncError};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCall {
    Entity(ChangeEvent),
    Invalidate(String, TableId),
    Revert(String, TableId),
}

#[derive(Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<CacheCall>>,
}

impl RecordingDispatcher {
    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reverted(&self) -> Vec<TableId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CacheCall::Revert(_, t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn invalidated(&self) -> Vec<TableId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CacheCall::Invalidate(_, t) => Some(t),
                _ => None,
            })
            .collect()
    }
}

impl InvalidationDispatcher for RecordingDispatcher {
    fn invalidate_entity(&self, event: &ChangeEvent) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(CacheCall::Entity(event.clone()));
        Ok(())
    }

    fn invalidate_table(&self, project_ref: &str, table_id: TableId) -> Result<(), SyncError> {
        self.calls
            .lock()
            .unwrap()
            .push(CacheCall::Invalidate(project_ref.to_string(), table_id));
        Ok(())
    }

    fn revert_table(&self, project_ref: &str, table_id: TableId) -> Result<(), SyncError> {
        self.calls
            .lock()
            .unwrap()
            .push(CacheCall::Revert(project_ref.to_string(), table_id));
        Ok(())
    }
}

/// Transport whose results are scripted per call. Unscripted calls succeed.
#[derive(Default)]
pub struct ScriptedTransport {
    requests: Mutex<Vec<SaveRequest>>,
    results: Mutex<VecDeque<Result<(), SyncError>>>,
    hold: Mutex<Option<Arc<Notify>>>,
    entered: Notify,
}

impl ScriptedTransport {
    pub fn push_result(&self, result: Result<(), SyncError>) {
        self.results.lock().unwrap().push_back(result);
    }

    /// Park every following submission until the returned handle is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Resolves once a submission has reached the transport.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SaveRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MutationTransport for ScriptedTransport {
    async fn submit(&self, request: SaveRequest) -> Result<(), SyncError> {
        self.requests.lock().unwrap().push(request);
        self.entered.notify_one();

        let gate = self.hold.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Saved(usize),
    Failed(String),
    PanelClosed,
    PanelToggled,
}

#[derive(Default)]
pub struct RecordingFeedback {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingFeedback {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl QueueFeedback for RecordingFeedback {
    fn saved(&self, operations: usize) {
        self.notices.lock().unwrap().push(Notice::Saved(operations));
    }

    fn save_failed(&self, error: &SyncError) {
        self.notices.lock().unwrap().push(Notice::Failed(error.to_string()));
    }

    fn close_side_panel(&self) {
        self.notices.lock().unwrap().push(Notice::PanelClosed);
    }

    fn toggle_side_panel(&self) {
        self.notices.lock().unwrap().push(Notice::PanelToggled);
    }
}

pub struct Harness {
    pub coordinator: Arc<QueueSaveCoordinator>,
    pub store: Arc<OperationQueueStore>,
    pub transport: Arc<ScriptedTransport>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub feedback: Arc<RecordingFeedback>,
}

pub fn harness(project_ref: &str) -> Harness {
    let store = Arc::new(OperationQueueStore::new(ProjectScope::new(project_ref)));
    let transport = Arc::new(ScriptedTransport::default());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let feedback = Arc::new(RecordingFeedback::default());
    let coordinator = Arc::new(QueueSaveCoordinator::new(
        Arc::clone(&store),
        transport.clone(),
        dispatcher.clone(),
        feedback.clone(),
    ));
    Harness {
        coordinator,
        store,
        transport,
        dispatcher,
        feedback,
    }
}
