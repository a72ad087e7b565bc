use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use super::collection::CollectionHandle;
use crate::client::DocumentClient;
use crate::core::Result;

/// Proof that a batch raised collection throughput, carrying the value to
/// restore. The original throughput travels inside this value from upscale
/// to restore; nothing is recorded on the store itself.
///
/// The lease also owns the collection's scale lock, so two concurrent
/// batches cannot interleave their scale/restore windows.
#[derive(Debug)]
pub struct ThroughputLease {
    original: u32,
    _guard: OwnedMutexGuard<()>,
}

impl ThroughputLease {
    /// Throughput the collection had before the upscale.
    pub fn original(&self) -> u32 {
        self.original
    }
}

/// Decides whether a batch needs more throughput than the collection
/// currently has, raises it, and later restores the recorded value.
///
/// Stateless across calls; borrowed by the batch engine for one invocation.
pub struct ThroughputScaler<'a, C: DocumentClient + ?Sized> {
    client: &'a C,
    collection: &'a CollectionHandle,
    auto_scaling: bool,
    operation_cost: u32,
}

impl<'a, C: DocumentClient + ?Sized> ThroughputScaler<'a, C> {
    pub fn new(
        client: &'a C,
        collection: &'a CollectionHandle,
        auto_scaling: bool,
        operation_cost: u32,
    ) -> Self {
        Self {
            client,
            collection,
            auto_scaling,
            operation_cost,
        }
    }

    /// Upscales the collection if the batch demands it.
    ///
    /// Returns `None` when scaling is disabled or the current throughput
    /// already covers the estimated batch cost; no restoration is owed in
    /// that case. Otherwise the new throughput is the estimated requirement
    /// clamped to the collection's [min, max] range, and the returned lease
    /// records the pre-upscale value.
    pub async fn maybe_upscale(&self, batch_len: usize) -> Result<Option<ThroughputLease>> {
        if !self.auto_scaling || batch_len == 0 {
            return Ok(None);
        }

        let required = (batch_len as u64).saturating_mul(self.operation_cost as u64);
        if required <= self.collection.current_throughput() as u64 {
            debug!(
                batch_len,
                required,
                current = self.collection.current_throughput(),
                "batch fits in current throughput, no upscale"
            );
            return Ok(None);
        }

        let guard = self.collection.scale_lock().lock_owned().await;
        // Re-read under the lock; a concurrent batch may have scaled while
        // we waited.
        let original = self.collection.current_throughput();
        let descriptor = self.collection.descriptor();
        let target = required
            .min(descriptor.max_throughput as u64)
            .max(descriptor.min_throughput as u64) as u32;
        if target <= original {
            return Ok(None);
        }

        self.client
            .update_collection_throughput(&self.collection.link(), target)
            .await?;
        self.collection.set_current_throughput(target);
        info!(
            collection = %self.collection.link(),
            from = original,
            to = target,
            "upscaled collection throughput for batch"
        );

        Ok(Some(ThroughputLease {
            original,
            _guard: guard,
        }))
    }

    /// Restores the throughput recorded in the lease and releases the
    /// scale lock. Consumes the lease, so restoration runs at most once.
    pub async fn restore(&self, lease: ThroughputLease) -> Result<()> {
        let original = lease.original();
        self.client
            .update_collection_throughput(&self.collection.link(), original)
            .await?;
        self.collection.set_current_throughput(original);
        info!(
            collection = %self.collection.link(),
            to = original,
            "restored collection throughput after batch"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DocumentClient, InMemoryDocumentClient};
    use crate::entity::EntityDescriptor;
    use crate::store::collection::{CollectionDescriptor, CollectionHandle};
    use crate::store::config::StoreConfig;

    async fn fixture(max_throughput: u32) -> (InMemoryDocumentClient, CollectionHandle) {
        let client = InMemoryDocumentClient::new();
        let config = StoreConfig::new("db").max_throughput(max_throughput);
        let descriptor = CollectionDescriptor::from_parts(&config, &EntityDescriptor::new("Item"));
        client.create_database("db").await.unwrap();
        client
            .create_collection("db", &descriptor.creation_spec())
            .await
            .unwrap();
        (client, CollectionHandle::new(descriptor))
    }

    #[tokio::test]
    async fn test_upscale_records_original_and_restore_returns_to_it() {
        let (client, handle) = fixture(10_000).await;
        let scaler = ThroughputScaler::new(&client, &handle, true, 10);

        let lease = scaler.maybe_upscale(100).await.unwrap().expect("upscale");
        assert_eq!(lease.original(), 400);
        assert_eq!(handle.current_throughput(), 1000);
        assert_eq!(
            client.read_collection_throughput(&handle.link()).await.unwrap(),
            1000
        );

        scaler.restore(lease).await.unwrap();
        assert_eq!(handle.current_throughput(), 400);
        assert_eq!(
            client.read_collection_throughput(&handle.link()).await.unwrap(),
            400
        );
    }

    #[tokio::test]
    async fn test_no_lease_when_batch_fits_or_scaling_disabled() {
        let (client, handle) = fixture(10_000).await;

        let scaler = ThroughputScaler::new(&client, &handle, true, 10);
        assert!(scaler.maybe_upscale(40).await.unwrap().is_none());
        assert!(scaler.maybe_upscale(0).await.unwrap().is_none());

        let disabled = ThroughputScaler::new(&client, &handle, false, 10);
        assert!(disabled.maybe_upscale(500).await.unwrap().is_none());
        assert_eq!(handle.current_throughput(), 400);
    }

    #[tokio::test]
    async fn test_upscale_clamps_to_ceiling() {
        let (client, handle) = fixture(600).await;
        let scaler = ThroughputScaler::new(&client, &handle, true, 10);

        let lease = scaler.maybe_upscale(100).await.unwrap().expect("upscale");
        assert_eq!(lease.original(), 400);
        assert_eq!(handle.current_throughput(), 600);

        scaler.restore(lease).await.unwrap();
        assert_eq!(handle.current_throughput(), 400);
    }
}
