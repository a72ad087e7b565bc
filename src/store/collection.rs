use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::Mutex;

use super::config::StoreConfig;
use crate::client::{CollectionLink, CollectionSpec, IndexingPolicy};
use crate::entity::EntityDescriptor;

/// Static description of the collection a store operates on, assembled at
/// initialization from configuration plus the entity descriptor.
#[derive(Debug, Clone)]
pub struct CollectionDescriptor {
    pub database: String,
    pub name: String,
    pub partition_key_path: Option<String>,
    pub shared: bool,
    pub min_throughput: u32,
    pub default_throughput: u32,
    pub max_throughput: u32,
    pub indexing_policy: IndexingPolicy,
}

impl CollectionDescriptor {
    pub fn from_parts(config: &StoreConfig, entity: &EntityDescriptor) -> Self {
        let name = config
            .collection
            .clone()
            .unwrap_or_else(|| entity.collection_name.clone());
        Self {
            database: config.database.clone(),
            name,
            partition_key_path: entity.partition_key_path.clone(),
            shared: entity.shared_collection,
            min_throughput: config.min_throughput,
            default_throughput: config.default_throughput,
            max_throughput: config.max_throughput,
            indexing_policy: config.indexing_policy.clone(),
        }
    }

    pub fn link(&self) -> CollectionLink {
        CollectionLink::new(self.database.clone(), self.name.clone())
    }

    pub fn creation_spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.name.clone(),
            partition_key_path: self.partition_key_path.clone(),
            throughput: self.default_throughput,
            indexing_policy: self.indexing_policy.clone(),
        }
    }
}

/// Descriptor plus the one piece of mutable shared state: the currently
/// provisioned throughput, and the mutex serializing scale/restore windows
/// of concurrent batches on the same store.
#[derive(Debug)]
pub struct CollectionHandle {
    descriptor: CollectionDescriptor,
    current_throughput: AtomicU32,
    scale_lock: Arc<Mutex<()>>,
}

impl CollectionHandle {
    pub fn new(descriptor: CollectionDescriptor) -> Self {
        let current = descriptor.default_throughput;
        Self {
            descriptor,
            current_throughput: AtomicU32::new(current),
            scale_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn descriptor(&self) -> &CollectionDescriptor {
        &self.descriptor
    }

    pub fn link(&self) -> CollectionLink {
        self.descriptor.link()
    }

    /// Last known provisioned throughput of the collection.
    pub fn current_throughput(&self) -> u32 {
        self.current_throughput.load(Ordering::Acquire)
    }

    pub(crate) fn set_current_throughput(&self, value: u32) {
        self.current_throughput.store(value, Ordering::Release);
    }

    pub(crate) fn scale_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.scale_lock)
    }
}
