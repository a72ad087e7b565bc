use tracing::info;

use super::collection::CollectionDescriptor;
use crate::client::{ClientError, DocumentClient, FailureKind};
use crate::core::{Result, StoreError};

/// Ensures the target database and collection exist before a store is
/// used. Runs once during store construction; failures here are fatal to
/// the store.
pub struct Provisioner<'a, C: DocumentClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: DocumentClient + ?Sized> Provisioner<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Creates the database unless it already exists.
    ///
    /// Returns whether a creation was performed. A conflict from a racing
    /// creator counts as "already existed".
    pub async fn ensure_database(&self, name: &str) -> Result<bool> {
        let existing = self
            .client
            .list_databases()
            .await
            .map_err(provisioning_error)?;
        if existing.iter().any(|db| db == name) {
            return Ok(false);
        }

        match self.client.create_database(name).await {
            Ok(()) => {
                info!(database = name, "created database");
                Ok(true)
            }
            Err(err) if err.kind == FailureKind::Conflict => Ok(false),
            Err(err) => Err(provisioning_error(err)),
        }
    }

    /// Creates the collection unless it already exists, applying the
    /// descriptor's partition-key path and indexing policy at creation
    /// time only. Existing collections are not reconciled.
    pub async fn ensure_collection(&self, descriptor: &CollectionDescriptor) -> Result<bool> {
        let existing = self
            .client
            .list_collections(&descriptor.database)
            .await
            .map_err(provisioning_error)?;
        if existing.iter().any(|col| col == &descriptor.name) {
            return Ok(false);
        }

        let spec = descriptor.creation_spec();
        match self
            .client
            .create_collection(&descriptor.database, &spec)
            .await
        {
            Ok(()) => {
                info!(
                    collection = %descriptor.link(),
                    throughput = spec.throughput,
                    partition_key = spec.partition_key_path.as_deref().unwrap_or("<none>"),
                    "created collection"
                );
                Ok(true)
            }
            Err(err) if err.kind == FailureKind::Conflict => Ok(false),
            Err(err) => Err(provisioning_error(err)),
        }
    }
}

fn provisioning_error(err: ClientError) -> StoreError {
    StoreError::Provisioning(err.to_string())
}
