use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{ClientError, ClientResult, CollectionLink, CollectionSpec, DocumentClient, DocumentQuery, IndexingPolicy};
use crate::core::Document;

#[derive(Debug, Clone)]
struct CollectionData {
    partition_key_path: Option<String>,
    throughput: u32,
    indexing_policy: IndexingPolicy,
    documents: HashMap<String, Document>,
}

#[derive(Debug, Clone, Default)]
struct DatabaseData {
    collections: HashMap<String, CollectionData>,
}

/// In-process [`DocumentClient`] with the same classified-failure semantics
/// as a remote service: create conflicts on duplicate ids, replace and
/// delete report not-found, queries apply equality filters, and point
/// reads/deletes on partitioned collections are scoped to the addressed
/// partition.
///
/// Used by the test suite and as a drop-in backend for local development.
#[derive(Default)]
pub struct InMemoryDocumentClient {
    state: Mutex<HashMap<String, DatabaseData>>,
}

impl InMemoryDocumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection, for assertions.
    pub async fn document_count(&self, link: &CollectionLink) -> usize {
        let state = self.state.lock().await;
        state
            .get(&link.database)
            .and_then(|db| db.collections.get(&link.collection))
            .map(|col| col.documents.len())
            .unwrap_or(0)
    }

    /// Indexing policy the collection was created with, for assertions.
    pub async fn collection_indexing_policy(
        &self,
        link: &CollectionLink,
    ) -> Option<IndexingPolicy> {
        let state = self.state.lock().await;
        state
            .get(&link.database)
            .and_then(|db| db.collections.get(&link.collection))
            .map(|col| col.indexing_policy.clone())
    }
}

fn missing_collection(link: &CollectionLink) -> ClientError {
    ClientError::not_found(format!("collection '{link}' does not exist"))
}

/// On a partitioned collection, point reads and deletes only see documents
/// in the partition the caller addressed.
fn in_partition_scope(partitioned: bool, doc: &Document, partition_key: Option<&str>) -> bool {
    !partitioned || doc.partition_key.as_deref() == partition_key
}

impl InMemoryDocumentClient {
    fn collection_mut<'a>(
        state: &'a mut HashMap<String, DatabaseData>,
        link: &CollectionLink,
    ) -> ClientResult<&'a mut CollectionData> {
        state
            .get_mut(&link.database)
            .and_then(|db| db.collections.get_mut(&link.collection))
            .ok_or_else(|| missing_collection(link))
    }
}

#[async_trait]
impl DocumentClient for InMemoryDocumentClient {
    async fn create_database(&self, name: &str) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        if state.contains_key(name) {
            return Err(ClientError::conflict(format!(
                "database '{name}' already exists"
            )));
        }
        state.insert(name.to_string(), DatabaseData::default());
        Ok(())
    }

    async fn list_databases(&self) -> ClientResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state.keys().cloned().collect())
    }

    async fn create_collection(&self, database: &str, spec: &CollectionSpec) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        let db = state
            .get_mut(database)
            .ok_or_else(|| ClientError::not_found(format!("database '{database}' does not exist")))?;
        if db.collections.contains_key(&spec.name) {
            return Err(ClientError::conflict(format!(
                "collection '{}' already exists",
                spec.name
            )));
        }
        db.collections.insert(
            spec.name.clone(),
            CollectionData {
                partition_key_path: spec.partition_key_path.clone(),
                throughput: spec.throughput,
                indexing_policy: spec.indexing_policy.clone(),
                documents: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn list_collections(&self, database: &str) -> ClientResult<Vec<String>> {
        let state = self.state.lock().await;
        let db = state
            .get(database)
            .ok_or_else(|| ClientError::not_found(format!("database '{database}' does not exist")))?;
        Ok(db.collections.keys().cloned().collect())
    }

    async fn update_collection_throughput(
        &self,
        link: &CollectionLink,
        throughput: u32,
    ) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        let col = Self::collection_mut(&mut state, link)?;
        col.throughput = throughput;
        Ok(())
    }

    async fn read_collection_throughput(&self, link: &CollectionLink) -> ClientResult<u32> {
        let mut state = self.state.lock().await;
        let col = Self::collection_mut(&mut state, link)?;
        Ok(col.throughput)
    }

    async fn create_document(
        &self,
        link: &CollectionLink,
        mut doc: Document,
    ) -> ClientResult<Document> {
        let mut state = self.state.lock().await;
        let col = Self::collection_mut(&mut state, link)?;
        if col.partition_key_path.is_some() && doc.partition_key.is_none() {
            return Err(ClientError::other(format!(
                "collection '{link}' is partitioned; document '{}' carries no partition key",
                doc.id
            )));
        }
        if col.documents.contains_key(&doc.id) {
            return Err(ClientError::conflict(format!(
                "document '{}' already exists in '{link}'",
                doc.id
            ))
            .with_charge(1.0));
        }
        doc.metadata.touch(Utc::now());
        col.documents.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn replace_document(
        &self,
        link: &CollectionLink,
        mut doc: Document,
    ) -> ClientResult<Document> {
        let mut state = self.state.lock().await;
        let col = Self::collection_mut(&mut state, link)?;
        if !col.documents.contains_key(&doc.id) {
            return Err(ClientError::not_found(format!(
                "document '{}' not found in '{link}'",
                doc.id
            ))
            .with_charge(1.0));
        }
        doc.metadata.touch(Utc::now());
        col.documents.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn upsert_document(
        &self,
        link: &CollectionLink,
        mut doc: Document,
    ) -> ClientResult<Document> {
        let mut state = self.state.lock().await;
        let col = Self::collection_mut(&mut state, link)?;
        doc.metadata.touch(Utc::now());
        col.documents.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn delete_document(
        &self,
        link: &CollectionLink,
        id: &str,
        partition_key: Option<&str>,
    ) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        let col = Self::collection_mut(&mut state, link)?;
        let partitioned = col.partition_key_path.is_some();
        let visible = col
            .documents
            .get(id)
            .is_some_and(|doc| in_partition_scope(partitioned, doc, partition_key));
        if !visible {
            return Err(ClientError::not_found(format!(
                "document '{id}' not found in '{link}'"
            )));
        }
        col.documents.remove(id);
        Ok(())
    }

    async fn read_document(
        &self,
        link: &CollectionLink,
        id: &str,
        partition_key: Option<&str>,
    ) -> ClientResult<Document> {
        let mut state = self.state.lock().await;
        let col = Self::collection_mut(&mut state, link)?;
        let partitioned = col.partition_key_path.is_some();
        col.documents
            .get(id)
            .filter(|doc| in_partition_scope(partitioned, doc, partition_key))
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("document '{id}' not found in '{link}'")))
    }

    async fn query_documents(
        &self,
        link: &CollectionLink,
        query: &DocumentQuery,
    ) -> ClientResult<Vec<Document>> {
        let mut state = self.state.lock().await;
        let col = Self::collection_mut(&mut state, link)?;
        let results = col
            .documents
            .values()
            .filter(|doc| {
                if let Some(entity_type) = &query.entity_type {
                    if doc.entity_type.as_deref() != Some(entity_type.as_str()) {
                        return false;
                    }
                }
                query
                    .filters
                    .iter()
                    .all(|(field, value)| doc.body_field(field) == Some(value))
            })
            .cloned()
            .collect();
        Ok(results)
    }
}
