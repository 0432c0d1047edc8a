//! Remote storage backend built on Redis
//!
//! Key layout (all keys carry the configured prefix):
//! - `entry:<id>`: JSON entry without visit count or last visit
//! - `owner:<id>`: owner key of the entry
//! - `ownerEntries:<owner>`: SET of entry ids owned by `<owner>`
//! - `entryVisits:<id>`: LIST of JSON visitors, newest at index 0
//!
//! There are no cross-key transactions here. `create` and `delete` are
//! sequences of independent commands; a failure part-way through leaves the
//! earlier steps in place and surfaces the first error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, RedisResult, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, error, info, trace, warn};

use crate::errors::{Result, StoreError};
use crate::storage::{Entry, Storage, Visitor};

const SCAN_BATCH: usize = 200;

pub struct RedisStorage {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
}

impl RedisStorage {
    /// Connect and ping the server; an unreachable server fails fast.
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self> {
        let storage = Self::new(url, key_prefix)?;

        let mut conn = storage.get_connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!(
                    "Failed to ping Redis server: {}. Check Redis server status and URL",
                    e
                );
                StoreError::database_connection(format!("redis ping failed: {}", e))
            })?;
        debug!("Redis connection test successful: {}", pong);

        info!(
            "Redis storage initialized with prefix '{}'",
            storage.key_prefix
        );
        Ok(storage)
    }

    fn new(url: &str, key_prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::config(format!("invalid redis url '{}': {}", url, e)))?;

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: key_prefix.to_string(),
        })
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                StoreError::database_connection(format!("could not connect to redis: {}", e))
            })?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset");
    }

    /// Log a failed command and convert it, dropping the cached connection
    /// when the failure looks like a broken link.
    async fn check<T>(&self, result: RedisResult<T>, ctx: impl FnOnce() -> String) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                let ctx = ctx();
                error!("{}: {}", ctx, e);
                if e.is_io_error() || e.is_connection_dropped() {
                    self.reset_connection().await;
                }
                Err(StoreError::from(e).context(ctx))
            }
        }
    }

    fn entry_key(&self, id: &str) -> String {
        format!("{}entry:{}", self.key_prefix, id)
    }

    fn owner_key_of(&self, id: &str) -> String {
        format!("{}owner:{}", self.key_prefix, id)
    }

    fn owner_entries_key(&self, owner_key: &str) -> String {
        format!("{}ownerEntries:{}", self.key_prefix, owner_key)
    }

    fn visits_key(&self, id: &str) -> String {
        format!("{}entryVisits:{}", self.key_prefix, id)
    }
}

/// Escape the glob metacharacters of a literal key part for `SCAN MATCH`.
fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Fill in the visit fields of an entry from its visitor list.
///
/// The count is the list length; the last visit is the timestamp of the most
/// recently pushed visitor. Either falls back (0, the epoch) when the list is
/// empty or could not be read.
fn derive_visit_fields(
    entry: &mut Entry,
    id: &str,
    list_len: Option<u64>,
    newest: Option<&str>,
) {
    entry.public.visit_count = list_len.unwrap_or(0);

    // DateTime::default() is 1970-01-01T00:00:00Z
    let mut last_visit = DateTime::<Utc>::default();
    if let Some(raw) = newest {
        match serde_json::from_str::<Visitor>(raw) {
            Ok(visitor) => last_visit = visitor.timestamp,
            Err(e) => warn!("Could not parse last visitor of entry '{}': {}", id, e),
        }
    }
    entry.public.last_visit = Some(last_visit);
}

#[async_trait]
impl Storage for RedisStorage {
    async fn get_by_id(&self, id: &str) -> Result<Entry> {
        let entry_key = self.entry_key(id);
        let mut conn = self.get_connection().await?;

        let raw: Option<String> = self
            .check(conn.get(&entry_key).await, || {
                format!("could not look up key '{}'", entry_key)
            })
            .await?;
        let raw = raw.ok_or_else(|| {
            StoreError::not_found(format!("no entry found with id '{}'", id))
        })?;
        trace!("Got entry for key '{}'", entry_key);

        let mut entry: Entry = serde_json::from_str(&raw).map_err(|e| {
            error!("Could not unmarshal entry '{}': {}", id, e);
            StoreError::serialization(format!("could not parse entry '{}': {}", id, e))
        })?;

        let visits_key = self.visits_key(id);
        let list_len: RedisResult<u64> = conn.llen(&visits_key).await;
        let list_len = match list_len {
            Ok(len) => Some(len),
            Err(e) => {
                warn!(
                    "Could not get length of visitor list for id '{}': {}",
                    id, e
                );
                None
            }
        };
        let newest: RedisResult<Option<String>> = conn.lindex(&visits_key, 0).await;
        let newest = match newest {
            Ok(newest) => newest,
            Err(e) => {
                warn!("Could not fetch newest visitor for id '{}': {}", id, e);
                None
            }
        };

        derive_visit_fields(&mut entry, id, list_len, newest.as_deref());
        Ok(entry)
    }

    async fn create(&self, entry: &Entry, id: &str, owner_key: &str) -> Result<()> {
        // 访问次数由访问列表推导，不写入条目本身
        let mut payload = entry.clone();
        payload.public.visit_count = 0;
        payload.public.last_visit = None;
        let raw = serde_json::to_string(&payload)?;

        let mut conn = self.get_connection().await?;

        let entry_key = self.entry_key(id);
        let created: bool = self
            .check(conn.set_nx(&entry_key, &raw).await, || {
                format!(
                    "could not set key '{}' for owner '{}'",
                    entry_key, owner_key
                )
            })
            .await?;
        if !created {
            return Err(StoreError::already_exists(format!(
                "entry '{}' already exists",
                id
            )));
        }

        // A visitor list left behind by an interrupted delete must not count
        // towards the new entry.
        let visits_key = self.visits_key(id);
        let _: usize = self
            .check(conn.del(&visits_key).await, || {
                format!("could not reset key '{}'", visits_key)
            })
            .await?;

        let owner_mapping = self.owner_key_of(id);
        let _: () = self
            .check(conn.set(&owner_mapping, owner_key).await, || {
                format!(
                    "could not set key '{}' for owner '{}'",
                    owner_mapping, owner_key
                )
            })
            .await?;

        let owner_entries = self.owner_entries_key(owner_key);
        let _: usize = self
            .check(conn.sadd(&owner_entries, id).await, || {
                format!("could not add entry '{}' to owner '{}'", id, owner_key)
            })
            .await?;

        debug!("Entry '{}' written for owner '{}'", id, owner_key);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;

        let entry_key = self.entry_key(id);
        let removed: usize = self
            .check(conn.del(&entry_key).await, || {
                format!("could not delete entry id '{}'", id)
            })
            .await?;
        if removed == 0 {
            return Err(StoreError::not_found(format!(
                "entry '{}' already deleted",
                id
            )));
        }

        let visits_key = self.visits_key(id);
        let _: usize = self
            .check(conn.del(&visits_key).await, || {
                format!("could not delete visitors list for id '{}'", id)
            })
            .await?;

        let owner_mapping = self.owner_key_of(id);
        let owner: Option<String> = self
            .check(conn.get(&owner_mapping).await, || {
                format!("could not fetch owner mapping for id '{}'", id)
            })
            .await?;

        match owner {
            Some(owner) => {
                let owner_entries = self.owner_entries_key(&owner);
                let _: usize = self
                    .check(conn.srem(&owner_entries, id).await, || {
                        format!("could not remove entry '{}' from owner '{}'", id, owner)
                    })
                    .await?;
            }
            None => warn!("Entry '{}' had no owner mapping", id),
        }

        let _: usize = self
            .check(conn.del(&owner_mapping).await, || {
                format!("could not delete owner mapping for entry '{}'", id)
            })
            .await?;

        Ok(())
    }

    /// No-op: the visit count is the length of the visitor list and the last
    /// visit is read from its head, both in `get_by_id`. Nothing is stored
    /// twice.
    async fn increase_visit_counter(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn register_visitor(&self, id: &str, visit_id: &str, visitor: &Visitor) -> Result<()> {
        let data = serde_json::to_string(visitor)?;
        let mut conn = self.get_connection().await?;

        // EXISTS 与 LPUSH 之间仍有竞争窗口，只挡住已删除条目的常见情况
        let entry_key = self.entry_key(id);
        let exists: bool = self
            .check(conn.exists(&entry_key).await, || {
                format!("could not look up key '{}'", entry_key)
            })
            .await?;
        if !exists {
            return Err(StoreError::not_found(format!(
                "no entry found with id '{}'",
                id
            )));
        }

        let visits_key = self.visits_key(id);
        let _: usize = self
            .check(conn.lpush(&visits_key, &data).await, || {
                format!("could not register visit '{}' for id '{}'", visit_id, id)
            })
            .await?;
        Ok(())
    }

    async fn get_visitors(&self, id: &str) -> Result<Vec<Visitor>> {
        let visits_key = self.visits_key(id);
        let mut conn = self.get_connection().await?;

        // TODO: page through LRANGE once visitor lists grow past a few thousand items
        let raw: Vec<String> = self
            .check(conn.lrange(&visits_key, 0, -1).await, || {
                format!("could not get visitors for id '{}'", id)
            })
            .await?;

        let mut visitors = raw
            .iter()
            .map(|v| serde_json::from_str::<Visitor>(v))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                StoreError::serialization(format!("could not parse visit of '{}': {}", id, e))
            })?;
        // 列表头部是最新的访问
        visitors.reverse();
        Ok(visitors)
    }

    async fn get_entries_for_owner(&self, owner_key: &str) -> Result<HashMap<String, Entry>> {
        let owner_entries = self.owner_entries_key(owner_key);
        let mut conn = self.get_connection().await?;

        let ids: Vec<String> = self
            .check(conn.smembers(&owner_entries).await, || {
                format!("could not fetch set of entries for owner '{}'", owner_key)
            })
            .await?;

        let mut entries = HashMap::new();
        for id in ids {
            match self.get_by_id(&id).await {
                Ok(entry) => {
                    entries.insert(id, entry);
                }
                Err(e) => warn!("Could not get entry '{}': {}", id, e),
            }
        }
        Ok(entries)
    }

    async fn get_all_entries(&self) -> Result<HashMap<String, Entry>> {
        let entry_prefix = self.entry_key("");
        let pattern = format!("{}*", escape_glob(&entry_prefix));
        let mut conn = self.get_connection().await?;

        let mut ids = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let page: RedisResult<(u64, Vec<String>)> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await;
            let (next, keys) = self
                .check(page, || {
                    format!("could not scan keys matching '{}'", pattern)
                })
                .await?;

            ids.extend(
                keys.iter()
                    .filter_map(|k| k.strip_prefix(&entry_prefix))
                    .map(str::to_string),
            );
            if next == 0 {
                break;
            }
            cursor = next;
        }

        let mut entries = HashMap::new();
        for id in ids {
            match self.get_by_id(&id).await {
                Ok(entry) => {
                    entries.insert(id, entry);
                }
                Err(e) => warn!("Could not get entry '{}': {}", id, e),
            }
        }
        Ok(entries)
    }

    async fn close(&self) -> Result<()> {
        self.reset_connection().await;
        info!("Redis storage closed");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
