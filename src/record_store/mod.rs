/// Record Store
///
/// The external CRM that holds users, products, accounts and call
/// activity. Supports multiple backend implementations (Salesforce REST,
/// in-memory).

pub mod memory;
pub mod models;
pub mod salesforce;
pub mod soql;

pub use memory::{MemoryStore, StoreCall};
pub use models::*;
pub use salesforce::SalesforceStore;

use crate::{
    config::RecordStoreConfig,
    error::{PortalResult, RemoteError},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Record store backend trait
///
/// Every method may fail with an opaque upstream message. Callers surface
/// that message as-is and never retry.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Run a structured query
    async fn query(&self, spec: &QuerySpec) -> Result<QueryResult, RemoteError>;

    /// Fetch field metadata for an object type
    async fn describe(&self, object: &str) -> Result<ObjectSchema, RemoteError>;

    /// Create a record and return its id
    async fn create(&self, object: &str, fields: &Record) -> Result<String, RemoteError>;

    /// Update fields on an existing record
    async fn update(&self, object: &str, id: &str, fields: &Record) -> Result<(), RemoteError>;
}

/// Build the configured backend
pub async fn from_config(config: &RecordStoreConfig) -> PortalResult<Arc<dyn RecordStore>> {
    match config {
        RecordStoreConfig::Salesforce(sf) => {
            tracing::info!("Using Salesforce record store at {}", sf.login_url);
            Ok(Arc::new(SalesforceStore::new(sf.clone())?))
        }
        RecordStoreConfig::Memory { seed_file } => {
            let store = match seed_file {
                Some(path) => {
                    tracing::info!("Using memory record store seeded from {:?}", path);
                    MemoryStore::from_seed_file(path).await?
                }
                None => {
                    tracing::warn!("Using empty memory record store");
                    MemoryStore::new()
                }
            };
            Ok(Arc::new(store))
        }
    }
}
