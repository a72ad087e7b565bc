pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::Document;

pub use memory::InMemoryDocumentClient;

/// Classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service signalled that provisioned throughput was exceeded.
    RateLimited,
    /// The target document already exists (or an etag precondition failed).
    Conflict,
    /// The target database, collection or document does not exist.
    NotFound,
    /// Any other remote failure.
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RateLimited => "rate limited",
            Self::Conflict => "conflict",
            Self::NotFound => "not found",
            Self::Other => "failure",
        };
        f.write_str(name)
    }
}

/// A classified failure returned by the document client.
///
/// Carries the request-charge metric reported by the service for the
/// failed call, so callers can reason about consumed capacity.
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message} (charge: {request_charge})")]
pub struct ClientError {
    pub kind: FailureKind,
    pub message: String,
    pub request_charge: f64,
}

impl ClientError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            request_charge: 0.0,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RateLimited, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Conflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.request_charge = charge;
        self
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == FailureKind::RateLimited
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FailureKind::NotFound
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Address of a collection inside a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionLink {
    pub database: String,
    pub collection: String,
}

impl CollectionLink {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl std::fmt::Display for CollectionLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.database, self.collection)
    }
}

/// Indexing policy applied to a collection at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexingPolicy {
    pub automatic: bool,
    pub included_paths: Vec<String>,
    pub excluded_paths: Vec<String>,
}

impl Default for IndexingPolicy {
    fn default() -> Self {
        Self {
            automatic: true,
            included_paths: vec!["/*".to_string()],
            excluded_paths: Vec::new(),
        }
    }
}

/// Everything the client needs to create a collection.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub name: String,
    pub partition_key_path: Option<String>,
    pub throughput: u32,
    pub indexing_policy: IndexingPolicy,
}

/// Equality-filter query against a collection.
///
/// Expression translation is out of scope for this layer; the client
/// receives an already-flattened list of field filters.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Restricts results to one entity type in a shared collection.
    pub entity_type: Option<String>,
    /// Conjunctive field-equality filters over document bodies.
    pub filters: Vec<(String, serde_json::Value)>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_type(mut self, name: impl Into<String>) -> Self {
        self.entity_type = Some(name.into());
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.filters.push((field.into(), value));
        self
    }
}

/// Asynchronous client for a remote document database service.
///
/// Every call is a suspension point; every failure is classified into a
/// [`FailureKind`] with a request-charge metric attached.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    async fn create_database(&self, name: &str) -> ClientResult<()>;
    async fn list_databases(&self) -> ClientResult<Vec<String>>;

    async fn create_collection(&self, database: &str, spec: &CollectionSpec) -> ClientResult<()>;
    async fn list_collections(&self, database: &str) -> ClientResult<Vec<String>>;

    async fn update_collection_throughput(
        &self,
        link: &CollectionLink,
        throughput: u32,
    ) -> ClientResult<()>;
    async fn read_collection_throughput(&self, link: &CollectionLink) -> ClientResult<u32>;

    /// Creates a document; fails with [`FailureKind::Conflict`] if the id
    /// already exists in the collection.
    async fn create_document(&self, link: &CollectionLink, doc: Document)
    -> ClientResult<Document>;

    /// Replaces an existing document; fails with [`FailureKind::NotFound`]
    /// if it does not exist.
    async fn replace_document(
        &self,
        link: &CollectionLink,
        doc: Document,
    ) -> ClientResult<Document>;

    /// Creates or replaces, whichever applies.
    async fn upsert_document(&self, link: &CollectionLink, doc: Document)
    -> ClientResult<Document>;

    async fn delete_document(
        &self,
        link: &CollectionLink,
        id: &str,
        partition_key: Option<&str>,
    ) -> ClientResult<()>;

    async fn read_document(
        &self,
        link: &CollectionLink,
        id: &str,
        partition_key: Option<&str>,
    ) -> ClientResult<Document>;

    async fn query_documents(
        &self,
        link: &CollectionLink,
        query: &DocumentQuery,
    ) -> ClientResult<Vec<Document>>;
}
