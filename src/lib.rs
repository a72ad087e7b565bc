//! Repository and object-mapping layer for remote document databases.
//!
//! Register an entity type with an explicit [`EntityDescriptor`], open a
//! [`DocumentStore`] against any [`DocumentClient`] backend, and the layer
//! handles document-id derivation, partition-key routing, database and
//! collection provisioning, adaptive throughput scaling around large
//! batches, and rate-limit-aware retry of batched operations.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use docstore::{
//!     DocumentEntity, DocumentStore, EntityDescriptor, InMemoryDocumentClient, StoreConfig,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct User {
//!     id: Option<String>,
//!     name: String,
//! }
//!
//! impl DocumentEntity for User {
//!     fn descriptor() -> EntityDescriptor {
//!         EntityDescriptor::new("User").collection("users")
//!     }
//!     fn document_id(&self) -> Option<String> {
//!         self.id.clone()
//!     }
//!     fn set_document_id(&mut self, id: String) {
//!         self.id = Some(id);
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let client = Arc::new(InMemoryDocumentClient::new());
//! let config = StoreConfig::new("appdb").auto_scaling(true);
//! let store: DocumentStore<User, _> = DocumentStore::new(client, config).await.unwrap();
//!
//! let mut alice = User { id: None, name: "Alice".into() };
//! store.add(&mut alice).await.unwrap();
//!
//! let users = vec![
//!     User { id: None, name: "Bob".into() },
//!     User { id: None, name: "Carol".into() },
//! ];
//! let result = store.add_range(users).await.unwrap();
//! assert!(result.is_fully_successful());
//! # });
//! ```

pub mod client;
pub mod core;
pub mod entity;
pub mod store;

// Re-export main types for convenience
pub use crate::core::{Document, DocumentMetadata, Result, StoreError};
pub use entity::{DocumentEntity, EntityDescriptor};
pub use store::{
    BatchOptions, BatchResult, CancellationFlag, DocumentStore, FailedEntity, OperationStatus,
    StoreConfig,
};

// Re-export client API
pub use client::{
    ClientError, ClientResult, CollectionLink, CollectionSpec, DocumentClient, DocumentQuery,
    FailureKind, InMemoryDocumentClient, IndexingPolicy,
};
