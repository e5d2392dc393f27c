//! Operation queue save/cancel lifecycle against scripted doubles.

mod common;

use std::sync::Arc;

use common::{CacheCall, Notice, harness};
use pg_cache_sync::queue::{
    NewOperation, ProjectScope, QueueShortcut, QueueStatus, RoleToken, SaveOutcome, SkipReason,
    TableId,
};
use pg_cache_sync::SyncError;
use serde_json::json;

fn edit(table: u32, id: i64) -> NewOperation {
    NewOperation::update(TableId(table), json!({"id": id, "v": 2}), json!({"id": id, "v": 1}))
}

// ── Save ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_successful_save_empties_queue_and_invalidates_tables() {
    let h = harness("proj");
    h.store.enqueue(edit(10, 1));
    h.store.enqueue(NewOperation::insert(TableId(20), json!({"id": 5})));
    h.store.enqueue(edit(10, 2));

    let outcome = h.coordinator.save(None).await.unwrap();

    assert_eq!(
        outcome,
        SaveOutcome::Saved {
            operations: 3,
            tables: vec![TableId(10), TableId(20)],
        }
    );
    let state = h.store.snapshot();
    assert!(state.operations.is_empty());
    assert_eq!(state.status, QueueStatus::Idle);
    assert_eq!(h.dispatcher.invalidated(), vec![TableId(10), TableId(20)]);
    assert_eq!(h.feedback.notices(), vec![Notice::PanelClosed, Notice::Saved(3)]);
}

#[tokio::test]
async fn test_save_sends_whole_batch_in_enqueue_order() {
    let h = harness("proj");
    let ids = [
        h.store.enqueue(edit(1, 1)),
        h.store.enqueue(NewOperation::delete(TableId(2), json!({"id": 9}))),
        h.store.enqueue(edit(1, 1)),
    ];
    let role = RoleToken("authenticated".into());

    h.coordinator.save(Some(role.clone())).await.unwrap();

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 1);
    let sent: Vec<_> = requests[0].operations.iter().map(|op| op.id).collect();
    assert_eq!(sent, ids);
    assert_eq!(requests[0].scope, ProjectScope::new("proj"));
    assert_eq!(requests[0].role, Some(role));
}

#[tokio::test]
async fn test_failed_save_keeps_queue_and_goes_idle() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));
    h.store.enqueue(edit(2, 1));
    let before = h.store.snapshot().operations;
    h.transport
        .push_result(Err(SyncError::MutationRejected("duplicate key value".into())));

    let err = h.coordinator.save(None).await.unwrap_err();

    assert_eq!(err, SyncError::MutationRejected("duplicate key value".into()));
    assert!(err.is_user_visible());
    let state = h.store.snapshot();
    assert_eq!(state.operations, before);
    assert_eq!(state.status, QueueStatus::Idle);
    assert!(h.dispatcher.calls().is_empty());
    assert_eq!(h.feedback.notices(), vec![Notice::Failed(err.to_string())]);
}

#[tokio::test]
async fn test_retry_after_failure_submits_same_batch() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));
    h.transport.push_result(Err(SyncError::Transport("connection reset".into())));

    assert!(h.coordinator.save(None).await.unwrap_err().is_retryable());
    h.coordinator.save(None).await.unwrap();

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].operations, requests[1].operations);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_save_with_empty_queue_does_not_call_server() {
    let h = harness("proj");
    let outcome = h.coordinator.save(None).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::EmptyQueue));
    assert_eq!(h.transport.calls(), 0);
    assert!(h.feedback.notices().is_empty());
}

#[tokio::test]
async fn test_save_while_saving_is_noop() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));
    let gate = h.transport.hold();

    let first = tokio::spawn({
        let coordinator = Arc::clone(&h.coordinator);
        async move { coordinator.save(None).await }
    });
    h.transport.entered().await;
    assert_eq!(h.store.status(), QueueStatus::Saving);

    let second = h.coordinator.save(None).await.unwrap();
    assert_eq!(second, SaveOutcome::Skipped(SkipReason::AlreadySaving));
    assert_eq!(h.transport.calls(), 1);

    gate.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { operations: 1, .. }));
    assert_eq!(h.transport.calls(), 1);
    assert_eq!(h.store.status(), QueueStatus::Idle);
}

#[tokio::test]
async fn test_operations_enqueued_during_save_survive_it() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));
    let gate = h.transport.hold();

    let save = tokio::spawn({
        let coordinator = Arc::clone(&h.coordinator);
        async move { coordinator.save(None).await }
    });
    h.transport.entered().await;
    let late = h.store.enqueue(edit(3, 7));
    gate.notify_one();
    save.await.unwrap().unwrap();

    let state = h.store.snapshot();
    assert_eq!(state.status, QueueStatus::Idle);
    assert_eq!(state.operations.len(), 1);
    assert_eq!(state.operations[0].id, late);
    // Only the submitted table was invalidated.
    assert_eq!(h.dispatcher.invalidated(), vec![TableId(1)]);
}

// ── Cancel ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_reverts_distinct_tables_and_empties_queue() {
    let h = harness("proj");
    h.store.enqueue(edit(4, 1));
    h.store.enqueue(edit(9, 1));
    h.store.enqueue(edit(4, 2));

    let outcome = h.coordinator.cancel();

    assert_eq!(outcome.discarded, 3);
    assert_eq!(outcome.reverted_tables, vec![TableId(4), TableId(9)]);
    assert_eq!(
        h.dispatcher.calls(),
        vec![
            CacheCall::Revert("proj".into(), TableId(4)),
            CacheCall::Revert("proj".into(), TableId(9)),
        ]
    );
    assert!(h.store.is_empty());
    assert_eq!(h.store.status(), QueueStatus::Idle);
    assert_eq!(h.transport.calls(), 0);
}

#[tokio::test]
async fn test_cancel_during_save_wins_over_late_completion() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));
    h.store.enqueue(edit(2, 1));
    let gate = h.transport.hold();

    let save = tokio::spawn({
        let coordinator = Arc::clone(&h.coordinator);
        async move { coordinator.save(None).await }
    });
    h.transport.entered().await;

    let cancelled = h.coordinator.cancel();
    assert_eq!(cancelled.reverted_tables, vec![TableId(1), TableId(2)]);
    assert!(h.store.is_empty());
    assert_eq!(h.store.status(), QueueStatus::Idle);

    let fresh = h.store.enqueue(edit(5, 1));
    // The abandoned submission is still outstanding.
    let early = h.coordinator.save(None).await.unwrap();
    assert_eq!(early, SaveOutcome::Skipped(SkipReason::AlreadySaving));
    assert_eq!(h.transport.calls(), 1);
    assert!(!h.coordinator.shortcuts_enabled());

    gate.notify_one();
    save.await.unwrap().unwrap();

    // The stale completion leaves the new queue alone.
    let state = h.store.snapshot();
    assert_eq!(state.operations.len(), 1);
    assert_eq!(state.operations[0].id, fresh);
    assert_eq!(state.status, QueueStatus::Idle);
    // The server did apply the batch, so its tables are refetched.
    assert_eq!(h.dispatcher.reverted(), vec![TableId(1), TableId(2)]);
    assert_eq!(h.dispatcher.invalidated(), vec![TableId(1), TableId(2)]);

    // Once it resolved, the fresh queue saves normally.
    gate.notify_one();
    h.coordinator.save(None).await.unwrap();
    assert_eq!(h.transport.calls(), 2);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_clear_during_save_does_not_wedge_queue() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));
    let gate = h.transport.hold();

    let save = tokio::spawn({
        let coordinator = Arc::clone(&h.coordinator);
        async move { coordinator.save(None).await }
    });
    h.transport.entered().await;
    h.store.clear();
    gate.notify_one();
    save.await.unwrap().unwrap();

    assert_eq!(h.store.status(), QueueStatus::Idle);
    assert!(!h.store.save_in_flight());

    h.store.enqueue(edit(2, 1));
    gate.notify_one();
    let next = h.coordinator.save(None).await.unwrap();
    assert!(matches!(next, SaveOutcome::Saved { operations: 1, .. }));
    assert_eq!(h.transport.calls(), 2);
}

#[tokio::test]
async fn test_failed_save_after_clear_still_goes_idle() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));
    let gate = h.transport.hold();
    h.transport.push_result(Err(SyncError::Transport("timeout".into())));

    let save = tokio::spawn({
        let coordinator = Arc::clone(&h.coordinator);
        async move { coordinator.save(None).await }
    });
    h.transport.entered().await;
    h.store.clear();
    gate.notify_one();
    assert!(save.await.unwrap().is_err());

    assert_eq!(h.store.status(), QueueStatus::Idle);
    assert!(!h.store.save_in_flight());
}

#[tokio::test]
async fn test_restored_saving_status_does_not_block_save() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));
    h.store.set_status(QueueStatus::Saving);

    assert!(h.coordinator.shortcuts_enabled());
    let outcome = h.coordinator.save(None).await.unwrap();

    assert!(matches!(outcome, SaveOutcome::Saved { operations: 1, .. }));
    assert_eq!(h.store.status(), QueueStatus::Idle);
}

// ── Shortcuts ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_shortcuts_ignored_without_pending_operations() {
    let h = harness("proj");
    let response = h.coordinator.handle_shortcut(QueueShortcut::Save, None).await;
    assert!(!response.handled && !response.stop_propagation);
    assert_eq!(h.transport.calls(), 0);
}

#[tokio::test]
async fn test_save_shortcut_saves_and_stops_propagation() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));

    let response = h.coordinator.handle_shortcut(QueueShortcut::Save, None).await;

    assert!(response.handled && response.stop_propagation);
    assert_eq!(h.transport.calls(), 1);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_failed_shortcut_save_is_still_handled() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));
    h.transport.push_result(Err(SyncError::Transport("offline".into())));

    let response = h.coordinator.handle_shortcut(QueueShortcut::Save, None).await;

    assert!(response.handled);
    assert_eq!(h.store.len(), 1);
    assert!(matches!(h.feedback.notices().as_slice(), [Notice::Failed(_)]));
}

#[tokio::test]
async fn test_shortcuts_ignored_while_saving() {
    let h = harness("proj");
    h.store.enqueue(edit(1, 1));
    let gate = h.transport.hold();

    let save = tokio::spawn({
        let coordinator = Arc::clone(&h.coordinator);
        async move { coordinator.save(None).await }
    });
    h.transport.entered().await;

    let response = h
        .coordinator
        .handle_shortcut(QueueShortcut::ToggleQueuePanel, None)
        .await;
    assert!(!response.handled);
    assert!(!h.feedback.notices().contains(&Notice::PanelToggled));

    gate.notify_one();
    save.await.unwrap().unwrap();
}

// ── Scope ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scope_switch_discards_queue_without_server_call() {
    let h = harness("proj-a");
    h.store.enqueue(edit(1, 1));

    assert!(h.store.switch_scope(ProjectScope::new("proj-b")));
    assert!(h.store.is_empty());

    h.store.enqueue(edit(2, 1));
    h.coordinator.save(None).await.unwrap();
    let requests = h.transport.requests();
    assert_eq!(requests[0].scope.project_ref, "proj-b");
    assert_eq!(
        h.dispatcher.calls(),
        vec![CacheCall::Invalidate("proj-b".into(), TableId(2))]
    );
}
