use crate::client::IndexingPolicy;
use crate::core::{Result, StoreError};

/// Conventional floor for provisioned collection throughput.
pub const MIN_COLLECTION_THROUGHPUT: u32 = 400;

/// Default estimate of request units consumed by one document operation,
/// used to size batch upscales.
pub const DEFAULT_OPERATION_COST: u32 = 10;

/// Store configuration, fixed at construction.
///
/// Built with the builder pattern and checked by [`StoreConfig::validate`]
/// before the store provisions anything.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database the store's collection lives in.
    pub database: String,

    /// Overrides the entity descriptor's collection name when set.
    pub collection: Option<String>,

    /// Floor the scaler will never go below.
    pub min_throughput: u32,

    /// Throughput a newly created collection is provisioned with.
    pub default_throughput: u32,

    /// Ceiling the scaler will never exceed.
    pub max_throughput: u32,

    /// Whether batches may temporarily raise collection throughput.
    pub auto_scaling: bool,

    /// Estimated request units consumed per single-document operation.
    pub operation_cost: u32,

    /// Indexing policy applied if the collection is created by this store.
    pub indexing_policy: IndexingPolicy,
}

impl StoreConfig {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            collection: None,
            min_throughput: MIN_COLLECTION_THROUGHPUT,
            default_throughput: MIN_COLLECTION_THROUGHPUT,
            max_throughput: 10_000,
            auto_scaling: false,
            operation_cost: DEFAULT_OPERATION_COST,
            indexing_policy: IndexingPolicy::default(),
        }
    }

    /// Set an explicit collection name.
    pub fn collection(mut self, name: &str) -> Self {
        self.collection = Some(name.to_string());
        self
    }

    /// Set the default (initial) throughput.
    pub fn default_throughput(mut self, throughput: u32) -> Self {
        self.default_throughput = throughput;
        self
    }

    /// Set the scaling ceiling.
    pub fn max_throughput(mut self, throughput: u32) -> Self {
        self.max_throughput = throughput;
        self
    }

    /// Set the scaling floor.
    pub fn min_throughput(mut self, throughput: u32) -> Self {
        self.min_throughput = throughput;
        self
    }

    /// Enable or disable automatic batch upscaling.
    pub fn auto_scaling(mut self, enabled: bool) -> Self {
        self.auto_scaling = enabled;
        self
    }

    /// Set the per-operation request-unit estimate.
    pub fn operation_cost(mut self, cost: u32) -> Self {
        self.operation_cost = cost;
        self
    }

    /// Set the indexing policy for collection creation.
    pub fn indexing_policy(mut self, policy: IndexingPolicy) -> Self {
        self.indexing_policy = policy;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(StoreError::Config("database name cannot be empty".into()));
        }
        if let Some(collection) = &self.collection {
            if collection.is_empty() {
                return Err(StoreError::Config("collection name cannot be empty".into()));
            }
        }
        if self.min_throughput == 0 {
            return Err(StoreError::Config("min_throughput must be > 0".into()));
        }
        if self.min_throughput > self.max_throughput {
            return Err(StoreError::Config(
                "min_throughput cannot exceed max_throughput".into(),
            ));
        }
        if self.default_throughput < self.min_throughput
            || self.default_throughput > self.max_throughput
        {
            return Err(StoreError::Config(format!(
                "default_throughput must lie within [{}, {}]",
                self.min_throughput, self.max_throughput
            )));
        }
        if self.operation_cost == 0 {
            return Err(StoreError::Config("operation_cost must be > 0".into()));
        }
        Ok(())
    }
}
