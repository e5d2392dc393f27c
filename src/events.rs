//! Change events emitted by the SQL classifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sql::{QualifiedName, StatementEffect};

/// The kind of cached entity a [`ChangeEvent`] concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Table,
    Function,
    Cron,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Table => "table",
            EntityType::Function => "function",
            EntityType::Cron => "cron",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One statement's possible effect on cached entities, tagged with the
/// project it ran against.
///
/// Field presence depends on `entity_type`:
///
/// | entity_type | schema | table | entity_name                  |
/// |-------------|--------|-------|------------------------------|
/// | `table`     | yes    | yes   | table name                   |
/// | `function`  | yes    | no    | function name, no arguments  |
/// | `cron`      | no     | no    | `schedule` / `unschedule`    |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub entity_name: String,
    pub project_ref: String,
}

impl ChangeEvent {
    /// Build the event for a classified statement. Unqualified names are
    /// placed in `default_schema`.
    pub fn from_effect(effect: StatementEffect, project_ref: &str, default_schema: &str) -> Self {
        let schema_or_default =
            |name: &QualifiedName| name.schema.clone().unwrap_or_else(|| default_schema.to_string());

        match effect {
            StatementEffect::Table(name) => Self {
                entity_type: EntityType::Table,
                schema: Some(schema_or_default(&name)),
                table: Some(name.name.clone()),
                entity_name: name.name,
                project_ref: project_ref.to_string(),
            },
            StatementEffect::Function(name) => Self {
                entity_type: EntityType::Function,
                schema: Some(schema_or_default(&name)),
                table: None,
                entity_name: name.name,
                project_ref: project_ref.to_string(),
            },
            StatementEffect::Cron(action) => Self {
                entity_type: EntityType::Cron,
                schema: None,
                table: None,
                entity_name: action.as_str().to_string(),
                project_ref: project_ref.to_string(),
            },
        }
    }
}
