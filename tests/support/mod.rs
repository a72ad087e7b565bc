#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docstore::{
    ClientError, ClientResult, CollectionLink, CollectionSpec, Document, DocumentClient,
    DocumentEntity, DocumentQuery, EntityDescriptor, FailureKind, InMemoryDocumentClient,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: Option<String>,
    pub title: String,
    pub priority: i64,
}

impl Ticket {
    pub fn new(title: &str, priority: i64) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            priority,
        }
    }

    pub fn with_id(id: &str, title: &str, priority: i64) -> Self {
        Self {
            id: Some(id.to_string()),
            title: title.to_string(),
            priority,
        }
    }
}

impl DocumentEntity for Ticket {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Ticket").collection("tickets")
    }

    fn document_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn set_document_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// Two entity types co-located in one shared collection, disambiguated by
/// the type discriminator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: Option<String>,
    pub text: String,
}

impl DocumentEntity for Note {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Note").collection("shared_items").shared()
    }

    fn document_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn set_document_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: Option<String>,
    pub label: String,
}

impl DocumentEntity for Tag {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Tag").collection("shared_items").shared()
    }

    fn document_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn set_document_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// Fake remote backend: a real [`InMemoryDocumentClient`] wrapped with
/// scripted rate limiting per document id, call counting, and optional
/// failure injection on the throughput-update path.
#[derive(Default)]
pub struct ThrottlingClient {
    inner: InMemoryDocumentClient,
    /// Remaining rate-limited responses per document id.
    throttle_remaining: Mutex<HashMap<String, usize>>,
    /// Write attempts per document id (including throttled ones).
    attempts: Mutex<HashMap<String, usize>>,
    /// Every value passed to update_collection_throughput, in order.
    throughput_updates: Mutex<Vec<u32>>,
    /// Failure kinds to inject, keyed by throughput-update call index.
    throughput_failures: Mutex<HashMap<usize, FailureKind>>,
    /// Total update_collection_throughput calls observed, failed ones included.
    throughput_update_calls: Mutex<usize>,
    /// Total document-level calls issued.
    document_calls: Mutex<usize>,
}

impl ThrottlingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryDocumentClient {
        &self.inner
    }

    /// Answer the next `count` write attempts for this document id with a
    /// rate-limited failure.
    pub fn throttle_next(&self, id: &str, count: usize) {
        self.throttle_remaining
            .lock()
            .unwrap()
            .insert(id.to_string(), count);
    }

    /// Make the next throughput update fail with the given classification.
    pub fn fail_next_throughput_update(&self, kind: FailureKind) {
        self.fail_throughput_update_after(0, kind);
    }

    /// Make the throughput update `skip` calls from now fail. `skip` of 1
    /// lets a batch's upscale succeed and hits its restore instead.
    pub fn fail_throughput_update_after(&self, skip: usize, kind: FailureKind) {
        let at = *self.throughput_update_calls.lock().unwrap() + skip;
        self.throughput_failures.lock().unwrap().insert(at, kind);
    }

    pub fn attempts_for(&self, id: &str) -> usize {
        self.attempts.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn throughput_updates(&self) -> Vec<u32> {
        self.throughput_updates.lock().unwrap().clone()
    }

    pub fn document_calls(&self) -> usize {
        *self.document_calls.lock().unwrap()
    }

    fn record_attempt(&self, id: &str) -> Result<(), ClientError> {
        *self.document_calls.lock().unwrap() += 1;
        *self.attempts.lock().unwrap().entry(id.to_string()).or_insert(0) += 1;

        let mut throttles = self.throttle_remaining.lock().unwrap();
        if let Some(remaining) = throttles.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(
                    ClientError::rate_limited(format!("document '{id}' throttled")).with_charge(1.0)
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentClient for ThrottlingClient {
    async fn create_database(&self, name: &str) -> ClientResult<()> {
        self.inner.create_database(name).await
    }

    async fn list_databases(&self) -> ClientResult<Vec<String>> {
        self.inner.list_databases().await
    }

    async fn create_collection(&self, database: &str, spec: &CollectionSpec) -> ClientResult<()> {
        self.inner.create_collection(database, spec).await
    }

    async fn list_collections(&self, database: &str) -> ClientResult<Vec<String>> {
        self.inner.list_collections(database).await
    }

    async fn update_collection_throughput(
        &self,
        link: &CollectionLink,
        throughput: u32,
    ) -> ClientResult<()> {
        let call_index = {
            let mut calls = self.throughput_update_calls.lock().unwrap();
            let index = *calls;
            *calls += 1;
            index
        };
        if let Some(kind) = self.throughput_failures.lock().unwrap().remove(&call_index) {
            return Err(ClientError::new(kind, "injected throughput-update failure"));
        }
        self.throughput_updates.lock().unwrap().push(throughput);
        self.inner.update_collection_throughput(link, throughput).await
    }

    async fn read_collection_throughput(&self, link: &CollectionLink) -> ClientResult<u32> {
        self.inner.read_collection_throughput(link).await
    }

    async fn create_document(
        &self,
        link: &CollectionLink,
        doc: Document,
    ) -> ClientResult<Document> {
        self.record_attempt(&doc.id)?;
        self.inner.create_document(link, doc).await
    }

    async fn replace_document(
        &self,
        link: &CollectionLink,
        doc: Document,
    ) -> ClientResult<Document> {
        self.record_attempt(&doc.id)?;
        self.inner.replace_document(link, doc).await
    }

    async fn upsert_document(
        &self,
        link: &CollectionLink,
        doc: Document,
    ) -> ClientResult<Document> {
        self.record_attempt(&doc.id)?;
        self.inner.upsert_document(link, doc).await
    }

    async fn delete_document(
        &self,
        link: &CollectionLink,
        id: &str,
        partition_key: Option<&str>,
    ) -> ClientResult<()> {
        self.record_attempt(id)?;
        self.inner.delete_document(link, id, partition_key).await
    }

    async fn read_document(
        &self,
        link: &CollectionLink,
        id: &str,
        partition_key: Option<&str>,
    ) -> ClientResult<Document> {
        *self.document_calls.lock().unwrap() += 1;
        self.inner.read_document(link, id, partition_key).await
    }

    async fn query_documents(
        &self,
        link: &CollectionLink,
        query: &DocumentQuery,
    ) -> ClientResult<Vec<Document>> {
        *self.document_calls.lock().unwrap() += 1;
        self.inner.query_documents(link, query).await
    }
}
