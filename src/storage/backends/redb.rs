//! Embedded storage backend built on redb
//!
//! Layout inside the single database file:
//! - `entries`: id -> JSON entry (visit counter stored inline)
//! - `entry_owners`: id -> owner key
//! - `visitors:<id>`: one table per entry, insertion sequence -> JSON visitor
//!
//! Every mutation runs inside one redb write transaction. redb admits a
//! single writer at a time while readers proceed on snapshots, which is what
//! keeps concurrent visit-counter increments from losing updates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition, TableError};
use tracing::{debug, info, warn};

use crate::errors::{Result, StoreError};
use crate::storage::{Entry, Storage, Visitor};

const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");
const ENTRY_OWNERS: TableDefinition<&str, &str> = TableDefinition::new("entry_owners");

fn visitors_table_name(id: &str) -> String {
    format!("visitors:{}", id)
}

fn visitors_table(name: &str) -> TableDefinition<'_, u64, &'static [u8]> {
    TableDefinition::new(name)
}

fn not_found(id: &str) -> StoreError {
    StoreError::not_found(format!("no entry found with id '{}'", id))
}

pub struct RedbStorage {
    db: RwLock<Option<Arc<Database>>>,
    path: PathBuf,
}

impl RedbStorage {
    /// Open (or create) the database file and make sure the fixed tables exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(|e| {
            StoreError::database_connection(format!(
                "could not open redb database '{}': {}",
                path.display(),
                e
            ))
        })?;

        let txn = db.begin_write()?;
        {
            txn.open_table(ENTRIES)?;
            txn.open_table(ENTRY_OWNERS)?;
        }
        txn.commit()?;

        info!("redb storage initialized at {}", path.display());
        Ok(Self {
            db: RwLock::new(Some(Arc::new(db))),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn database(&self) -> Result<Arc<Database>> {
        self.db
            .read()
            .clone()
            .ok_or_else(|| StoreError::database_connection("redb storage is closed"))
    }

    /// Run a blocking redb operation off the async runtime.
    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.database()?;
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::database_operation(format!("{} task failed: {}", op, e)))?
    }
}

#[async_trait]
impl Storage for RedbStorage {
    async fn get_by_id(&self, id: &str) -> Result<Entry> {
        let id = id.to_string();
        self.run("get_by_id", move |db| {
            let txn = db.begin_read()?;
            let table = txn.open_table(ENTRIES)?;
            let raw = table.get(id.as_str())?.ok_or_else(|| not_found(&id))?;
            Ok(serde_json::from_slice(raw.value())?)
        })
        .await
    }

    async fn create(&self, entry: &Entry, id: &str, owner_key: &str) -> Result<()> {
        let raw = serde_json::to_vec(entry)?;
        let id = id.to_string();
        let owner_key = owner_key.to_string();

        self.run("create", move |db| {
            let txn = db.begin_write()?;
            {
                let mut entries = txn.open_table(ENTRIES)?;
                if entries.get(id.as_str())?.is_some() {
                    return Err(StoreError::already_exists(format!(
                        "entry '{}' already exists",
                        id
                    )));
                }
                entries.insert(id.as_str(), raw.as_slice())?;

                let mut owners = txn.open_table(ENTRY_OWNERS)?;
                owners.insert(id.as_str(), owner_key.as_str())?;
            }
            txn.commit()?;
            debug!("Entry '{}' written for owner '{}'", id, owner_key);
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.run("delete", move |db| {
            let txn = db.begin_write()?;
            {
                let mut entries = txn.open_table(ENTRIES)?;
                if entries.remove(id.as_str())?.is_none() {
                    return Err(StoreError::not_found(format!(
                        "entry '{}' already deleted",
                        id
                    )));
                }

                let mut owners = txn.open_table(ENTRY_OWNERS)?;
                if owners.remove(id.as_str())?.is_none() {
                    warn!("Entry '{}' had no owner index row", id);
                }
            }
            let visitors = visitors_table_name(&id);
            txn.delete_table(visitors_table(&visitors))?;
            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn increase_visit_counter(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.run("increase_visit_counter", move |db| {
            let txn = db.begin_write()?;
            {
                let mut entries = txn.open_table(ENTRIES)?;
                let raw = entries
                    .get(id.as_str())?
                    .map(|guard| guard.value().to_vec())
                    .ok_or_else(|| not_found(&id))?;

                let mut entry: Entry = serde_json::from_slice(&raw)?;
                entry.public.visit_count += 1;
                entry.public.last_visit = Some(Utc::now());

                let updated = serde_json::to_vec(&entry)?;
                entries.insert(id.as_str(), updated.as_slice())?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn register_visitor(&self, id: &str, visit_id: &str, visitor: &Visitor) -> Result<()> {
        let data = serde_json::to_vec(visitor)?;
        let id = id.to_string();
        let visit_id = visit_id.to_string();

        self.run("register_visitor", move |db| {
            let txn = db.begin_write()?;
            {
                // 条目已删除时不再创建孤立的访问表
                let entries = txn.open_table(ENTRIES)?;
                if entries.get(id.as_str())?.is_none() {
                    return Err(not_found(&id));
                }

                // 键为写事务内递增的序号，迭代顺序即登记顺序
                let name = visitors_table_name(&id);
                let mut visitors = txn.open_table(visitors_table(&name))?;
                let seq = visitors.last()?.map_or(0, |(key, _)| key.value() + 1);
                visitors.insert(seq, data.as_slice())?;
                debug!("Visit '{}' stored as #{} of entry '{}'", visit_id, seq, id);
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_visitors(&self, id: &str) -> Result<Vec<Visitor>> {
        let name = visitors_table_name(id);
        self.run("get_visitors", move |db| {
            let txn = db.begin_read()?;
            let table = match txn.open_table(visitors_table(&name)) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut visitors = Vec::new();
            for item in table.iter()? {
                let (_, value) = item?;
                visitors.push(serde_json::from_slice::<Visitor>(value.value())?);
            }
            Ok(visitors)
        })
        .await
    }

    async fn get_entries_for_owner(&self, owner_key: &str) -> Result<HashMap<String, Entry>> {
        let owner_key = owner_key.to_string();
        self.run("get_entries_for_owner", move |db| {
            let txn = db.begin_read()?;
            let owners = txn.open_table(ENTRY_OWNERS)?;
            let entries = txn.open_table(ENTRIES)?;

            let mut result = HashMap::new();
            for item in owners.iter()? {
                let (key, value) = item?;
                if value.value() != owner_key.as_str() {
                    continue;
                }
                let id = key.value().to_string();
                match entries.get(id.as_str())? {
                    Some(raw) => {
                        let entry: Entry = serde_json::from_slice(raw.value())?;
                        result.insert(id, entry);
                    }
                    None => warn!("Owner index references missing entry '{}'", id),
                }
            }
            Ok(result)
        })
        .await
    }

    async fn get_all_entries(&self) -> Result<HashMap<String, Entry>> {
        self.run("get_all_entries", |db| {
            let txn = db.begin_read()?;
            let table = txn.open_table(ENTRIES)?;

            let mut result = HashMap::new();
            for item in table.iter()? {
                let (key, value) = item?;
                let entry: Entry = serde_json::from_slice(value.value())?;
                result.insert(key.value().to_string(), entry);
            }
            Ok(result)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        if self.db.write().take().is_some() {
            info!("redb storage at {} closed", self.path.display());
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redb"
    }
}
