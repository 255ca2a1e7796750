//! In-memory device, weather and notification-template records.
//!
//! Payloads are opaque JSON objects; only a few required fields are checked
//! so the protected endpoints have something to create, list and delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Device,
    Weather,
    Template,
}

impl ResourceKind {
    /// String fields a new record must carry.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Device => &["name"],
            ResourceKind::Weather => &["location"],
            ResourceKind::Template => &["name", "body"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Device => "device",
            ResourceKind::Weather => "weather",
            ResourceKind::Template => "template",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: Uuid,
    pub kind: ResourceKind,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub data: Value,
}

/// Insertion-ordered collection of records of one kind.
#[derive(Debug)]
pub struct Collection {
    kind: ResourceKind,
    records: RwLock<Vec<ResourceRecord>>,
}

impl Collection {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            records: RwLock::new(Vec::new()),
        }
    }

    pub async fn list(&self) -> Vec<ResourceRecord> {
        self.records.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<ResourceRecord> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    /// Validate and store a new record.
    pub async fn insert(&self, created_by: &str, data: Value) -> Result<ResourceRecord, ApiError> {
        validate(self.kind, &data)?;

        let record = ResourceRecord {
            id: Uuid::new_v4(),
            kind: self.kind,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            data,
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    /// Remove a record; false when the id is unknown.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        records.len() != before
    }
}

fn validate(kind: ResourceKind, data: &Value) -> Result<(), ApiError> {
    let Some(object) = data.as_object() else {
        return Err(ApiError::validation_error(
            format!("{} payload must be a JSON object", kind),
            None,
        ));
    };

    let mut field_errors = HashMap::new();
    for field in kind.required_fields() {
        let present = object
            .get(*field)
            .and_then(Value::as_str)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if !present {
            field_errors.insert(field.to_string(), "This field is required".to_string());
        }
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error(
            format!("Missing required {} fields", kind),
            Some(field_errors),
        ))
    }
}
