pub mod batch;
pub mod collection;
pub mod config;
pub mod outcome;
pub mod provision;
pub mod scaling;

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::client::{CollectionLink, DocumentClient, DocumentQuery};
use crate::core::{Result, StoreError};
use crate::entity::{DocumentEntity, ensure_document_id, from_document, to_document};

pub use batch::{BatchOptions, CancellationFlag};
pub use collection::{CollectionDescriptor, CollectionHandle};
pub use config::{DEFAULT_OPERATION_COST, MIN_COLLECTION_THROUGHPUT, StoreConfig};
pub use outcome::{BatchResult, FailedEntity, OperationStatus};
pub use provision::Provisioner;
pub use scaling::{ThroughputLease, ThroughputScaler};

use batch::execute_batch;
use scaling::ThroughputScaler as Scaler;

/// Repository facade for one entity type against one managed collection.
///
/// Construction provisions the database and collection; single-entity
/// operations delegate to the document client, batch operations to the
/// batch engine wired with the throughput scaler.
pub struct DocumentStore<T, C>
where
    T: DocumentEntity,
    C: DocumentClient,
{
    client: Arc<C>,
    config: StoreConfig,
    collection: CollectionHandle,
    link: CollectionLink,
    _entity: PhantomData<fn() -> T>,
}

impl<T, C> DocumentStore<T, C>
where
    T: DocumentEntity,
    C: DocumentClient,
{
    /// Validates the configuration, provisions the database and collection,
    /// and returns a ready store. Provisioning failures are fatal here;
    /// a store is never handed out against a missing collection.
    pub async fn new(client: Arc<C>, config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let descriptor = CollectionDescriptor::from_parts(&config, &T::descriptor());
        let provisioner = Provisioner::new(client.as_ref());
        provisioner.ensure_database(&descriptor.database).await?;
        let created = provisioner.ensure_collection(&descriptor).await?;

        let collection = CollectionHandle::new(descriptor);
        let link = collection.link();

        // An existing collection may carry a manually configured
        // throughput; pick it up so scale/restore honors it.
        if !created {
            let provisioned = client.read_collection_throughput(&link).await?;
            collection.set_current_throughput(provisioned);
        }

        debug!(collection = %link, entity = T::descriptor().type_name, "store initialized");
        Ok(Self {
            client,
            config,
            collection,
            link,
            _entity: PhantomData,
        })
    }

    pub fn link(&self) -> &CollectionLink {
        &self.link
    }

    /// Last known provisioned throughput of the backing collection.
    pub fn current_throughput(&self) -> u32 {
        self.collection.current_throughput()
    }

    fn scaler(&self) -> Scaler<'_, C> {
        Scaler::new(
            self.client.as_ref(),
            &self.collection,
            self.config.auto_scaling,
            self.config.operation_cost,
        )
    }

    // ------------------------------------------------------------------
    // Single-entity operations
    // ------------------------------------------------------------------

    /// Creates the entity's document, generating a document id first if
    /// the entity has none.
    pub async fn add(&self, entity: &mut T) -> Result<()> {
        ensure_document_id(entity);
        self.try_create(entity).await
    }

    /// Reads one entity by document id. Returns `None` when no matching
    /// document exists (or, for shared collections, when the document
    /// belongs to a different entity type).
    pub async fn get(&self, id: &str, partition_key: Option<&str>) -> Result<Option<T>> {
        match self
            .client
            .read_document(&self.link, id, partition_key)
            .await
        {
            Ok(doc) => {
                let descriptor = T::descriptor();
                if descriptor.shared_collection
                    && doc.entity_type.as_deref() != Some(descriptor.type_name)
                {
                    return Ok(None);
                }
                Ok(Some(from_document(doc)?))
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Replaces the entity's existing document.
    pub async fn update(&self, entity: &T) -> Result<()> {
        self.try_replace(entity).await
    }

    /// Creates or replaces, generating a document id first if absent.
    pub async fn upsert(&self, entity: &mut T) -> Result<()> {
        ensure_document_id(entity);
        self.try_upsert(entity).await
    }

    /// Deletes the entity's document.
    pub async fn remove(&self, entity: &T) -> Result<()> {
        self.try_delete(entity).await
    }

    /// Deletes by id; returns whether a document was removed.
    pub async fn remove_by_id(&self, id: &str, partition_key: Option<&str>) -> Result<bool> {
        match self
            .client
            .delete_document(&self.link, id, partition_key)
            .await
        {
            Ok(()) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// All entities of this type in the collection.
    pub async fn list_all(&self) -> Result<Vec<T>> {
        self.run_query(DocumentQuery::new()).await
    }

    /// Entities whose serialized body field equals the given value.
    pub async fn find_where(&self, field: &str, value: serde_json::Value) -> Result<Vec<T>> {
        self.run_query(DocumentQuery::new().filter(field, value)).await
    }

    /// Number of entities of this type in the collection.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.list_all().await?.len())
    }

    async fn run_query(&self, mut query: DocumentQuery) -> Result<Vec<T>> {
        let descriptor = T::descriptor();
        if descriptor.shared_collection {
            query = query.entity_type(descriptor.type_name);
        }
        let docs = self.client.query_documents(&self.link, &query).await?;
        docs.into_iter().map(from_document).collect()
    }

    // ------------------------------------------------------------------
    // Batch operations
    // ------------------------------------------------------------------

    /// Creates the batch concurrently; rate-limited entities are retried
    /// until the collection accepts them. See [`BatchOptions`] for the
    /// retry cap and cancellation.
    pub async fn add_range(&self, entities: Vec<T>) -> Result<BatchResult<T>> {
        self.add_range_with(entities, &BatchOptions::default()).await
    }

    pub async fn add_range_with(
        &self,
        mut entities: Vec<T>,
        options: &BatchOptions,
    ) -> Result<BatchResult<T>> {
        for entity in &mut entities {
            ensure_document_id(entity);
        }
        let scaler = self.scaler();
        execute_batch(entities, &scaler, options, |entity| async move {
            let outcome = self.try_create(&entity).await;
            (entity, outcome)
        })
        .await
    }

    /// Replaces the batch concurrently with rate-limit retry.
    pub async fn update_range(&self, entities: Vec<T>) -> Result<BatchResult<T>> {
        self.update_range_with(entities, &BatchOptions::default()).await
    }

    pub async fn update_range_with(
        &self,
        entities: Vec<T>,
        options: &BatchOptions,
    ) -> Result<BatchResult<T>> {
        let scaler = self.scaler();
        execute_batch(entities, &scaler, options, |entity| async move {
            let outcome = self.try_replace(&entity).await;
            (entity, outcome)
        })
        .await
    }

    /// Upserts the batch concurrently with rate-limit retry.
    pub async fn upsert_range(&self, entities: Vec<T>) -> Result<BatchResult<T>> {
        self.upsert_range_with(entities, &BatchOptions::default()).await
    }

    pub async fn upsert_range_with(
        &self,
        mut entities: Vec<T>,
        options: &BatchOptions,
    ) -> Result<BatchResult<T>> {
        for entity in &mut entities {
            ensure_document_id(entity);
        }
        let scaler = self.scaler();
        execute_batch(entities, &scaler, options, |entity| async move {
            let outcome = self.try_upsert(&entity).await;
            (entity, outcome)
        })
        .await
    }

    /// Deletes the batch concurrently with rate-limit retry.
    pub async fn remove_range(&self, entities: Vec<T>) -> Result<BatchResult<T>> {
        self.remove_range_with(entities, &BatchOptions::default()).await
    }

    pub async fn remove_range_with(
        &self,
        entities: Vec<T>,
        options: &BatchOptions,
    ) -> Result<BatchResult<T>> {
        let scaler = self.scaler();
        execute_batch(entities, &scaler, options, |entity| async move {
            let outcome = self.try_delete(&entity).await;
            (entity, outcome)
        })
        .await
    }

    // ------------------------------------------------------------------
    // Per-entity remote calls shared by single and batch paths
    // ------------------------------------------------------------------

    async fn try_create(&self, entity: &T) -> Result<()> {
        let doc = to_document(entity)?;
        self.client.create_document(&self.link, doc).await?;
        Ok(())
    }

    async fn try_replace(&self, entity: &T) -> Result<()> {
        let doc = to_document(entity)?;
        self.client.replace_document(&self.link, doc).await?;
        Ok(())
    }

    async fn try_upsert(&self, entity: &T) -> Result<()> {
        let doc = to_document(entity)?;
        self.client.upsert_document(&self.link, doc).await?;
        Ok(())
    }

    async fn try_delete(&self, entity: &T) -> Result<()> {
        let id = entity
            .document_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::MissingId(T::descriptor().type_name.to_string()))?;
        let partition_key = entity.partition_key();
        self.client
            .delete_document(&self.link, &id, partition_key.as_deref())
            .await?;
        Ok(())
    }
}
