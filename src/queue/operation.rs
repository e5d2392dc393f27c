//! Queued row mutations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier assigned to an operation when it is enqueued.
///
/// Ids increase monotonically within one store and are never reused, even
/// across `clear()` and scope switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub u64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// The table an operation targets (its relation id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

/// One pending row mutation, in the shape sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
    pub id: OperationId,
    pub table_id: TableId,
    pub kind: OperationKind,
    /// New row state; `None` for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Row state before the local edit; `None` for inserts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_value: Option<Value>,
    pub enqueued_at: DateTime<Utc>,
}

/// A mutation not yet in the queue.
///
/// The constructors guarantee the payload rules: inserts and updates carry
/// the new row, deletes do not.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOperation {
    table_id: TableId,
    kind: OperationKind,
    payload: Option<Value>,
    prior_value: Option<Value>,
}

impl NewOperation {
    pub fn insert(table_id: TableId, row: Value) -> Self {
        Self {
            table_id,
            kind: OperationKind::Insert,
            payload: Some(row),
            prior_value: None,
        }
    }

    pub fn update(table_id: TableId, row: Value, prior: Value) -> Self {
        Self {
            table_id,
            kind: OperationKind::Update,
            payload: Some(row),
            prior_value: Some(prior),
        }
    }

    pub fn delete(table_id: TableId, prior: Value) -> Self {
        Self {
            table_id,
            kind: OperationKind::Delete,
            payload: None,
            prior_value: Some(prior),
        }
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub(crate) fn into_queued(self, id: OperationId, enqueued_at: DateTime<Utc>) -> QueuedOperation {
        QueuedOperation {
            id,
            table_id: self.table_id,
            kind: self.kind,
            payload: self.payload,
            prior_value: self.prior_value,
            enqueued_at,
        }
    }
}

/// Distinct table ids of `operations`, in order of first appearance.
pub fn distinct_table_ids(operations: &[QueuedOperation]) -> Vec<TableId> {
    let mut tables: Vec<TableId> = Vec::new();
    for op in operations {
        if !tables.contains(&op.table_id) {
            tables.push(op.table_id);
        }
    }
    tables
}
