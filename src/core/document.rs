use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Result, StoreError};

/// Service-side bookkeeping attached to every stored document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last write.
    pub updated_at: DateTime<Utc>,
    /// Opaque version tag, replaced on every write.
    pub etag: String,
}

impl DocumentMetadata {
    /// Creates metadata initialized with the current time and a fresh etag.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            etag: Uuid::new_v4().to_string(),
        }
    }

    /// Marks a write: bumps `updated_at` and rotates the etag.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.etag = Uuid::new_v4().to_string();
    }
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

/// The wire-side record exchanged with the document client.
///
/// Entity values are serialized into `body`; id, partition key and the
/// shared-collection discriminator are lifted out so the client can route
/// without understanding the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub partition_key: Option<String>,
    /// Type discriminator, present only for shared collections.
    pub entity_type: Option<String>,
    pub body: serde_json::Value,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(id: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            partition_key: None,
            entity_type: None,
            body,
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn with_entity_type(mut self, name: impl Into<String>) -> Self {
        self.entity_type = Some(name.into());
        self
    }

    /// Returns the body as a JSON object, or an error if it is not one.
    pub fn body_object(&self) -> Result<&serde_json::Map<String, serde_json::Value>> {
        self.body
            .as_object()
            .ok_or_else(|| StoreError::InvalidBody(json_kind(&self.body).to_string()))
    }

    /// Reads a single body field, if present.
    pub fn body_field(&self, name: &str) -> Option<&serde_json::Value> {
        self.body.as_object().and_then(|fields| fields.get(name))
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
