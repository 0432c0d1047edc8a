//! Storage layer
//!
//! The [`Storage`] trait is the fixed capability set every backend offers to
//! the entry store. Two backends ship with the crate:
//!
//! - [`RedbStorage`]: embedded, single-file, fully transactional. The visit
//!   counter is a stored field updated by read-modify-write inside one write
//!   transaction; redb serializes writers, so concurrent increments never lose
//!   updates.
//! - [`RedisStorage`]: remote key/list store without cross-key transactions.
//!   The visit counter is derived from the length of the visitor list, and
//!   multi-key writes may leave partial state behind when a step fails.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::StaticConfig;
use crate::errors::{Result, StoreError};

pub mod backends;
pub mod models;

pub use backends::{RedbStorage, RedisStorage};
pub use models::{Entry, EntryPublic, Visitor, owner_key};

#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch an entry. Missing ids yield [`StoreError::NotFound`].
    async fn get_by_id(&self, id: &str) -> Result<Entry>;

    /// Persist a new entry and link it to `owner_key`.
    ///
    /// Fails with [`StoreError::AlreadyExists`] when `id` is taken.
    async fn create(&self, entry: &Entry, id: &str, owner_key: &str) -> Result<()>;

    /// Remove the entry, its visitor log and its owner-index linkage.
    async fn delete(&self, id: &str) -> Result<()>;

    async fn increase_visit_counter(&self, id: &str) -> Result<()>;

    async fn register_visitor(&self, id: &str, visit_id: &str, visitor: &Visitor) -> Result<()>;

    /// Visitor log of an entry in registration order, oldest first.
    async fn get_visitors(&self, id: &str) -> Result<Vec<Visitor>>;

    async fn get_entries_for_owner(&self, owner_key: &str) -> Result<HashMap<String, Entry>>;

    async fn get_all_entries(&self) -> Result<HashMap<String, Entry>>;

    async fn close(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

pub struct StorageFactory;

impl StorageFactory {
    /// Build the backend named by `store.backend`.
    pub async fn create(config: &StaticConfig) -> Result<Arc<dyn Storage>> {
        let store = &config.store;

        let storage: Arc<dyn Storage> = match store.backend.as_str() {
            "redb" => {
                let dir = Path::new(&store.data_dir);
                std::fs::create_dir_all(dir).map_err(|e| {
                    StoreError::file_operation(format!(
                        "could not create data directory '{}': {}",
                        store.data_dir, e
                    ))
                })?;
                Arc::new(RedbStorage::open(dir.join(&store.db_file))?)
            }
            "redis" => Arc::new(
                RedisStorage::connect(&config.redis.url, &config.redis.key_prefix).await?,
            ),
            other => {
                return Err(StoreError::storage_backend_not_found(format!(
                    "unknown storage backend '{}', expected 'redb' or 'redis'",
                    other
                )));
            }
        };

        info!("Using storage backend: {}", storage.backend_name());
        Ok(storage)
    }
}
