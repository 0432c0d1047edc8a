//! Entry store
//!
//! Coordinates ID allocation, URL validation, password hashing and deletion
//! tokens on top of any [`Storage`] backend. Holds no mutable state of its
//! own, so one instance can be shared across tasks behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::deletion::{DeletionAuthorizer, DeletionToken};
use crate::config::{StaticConfig, resolve_secret};
use crate::errors::{Result, StoreError};
use crate::storage::{Entry, Storage, StorageFactory, Visitor, owner_key};
use crate::utils::generate_random_id;
use crate::utils::password::{process_new_password, verify_password};
use crate::utils::url_validator::{normalize_url, validate_url};

pub const DEFAULT_MAX_ID_ATTEMPTS: u32 = 10;

pub struct EntryStore {
    storage: Arc<dyn Storage>,
    authorizer: DeletionAuthorizer,
    id_length: usize,
    max_attempts: u32,
}

impl EntryStore {
    pub fn new(
        storage: Arc<dyn Storage>,
        secret: impl AsRef<[u8]>,
        id_length: usize,
    ) -> Result<Self> {
        if id_length == 0 {
            return Err(StoreError::config("id length must be at least 1"));
        }
        Ok(Self {
            storage,
            authorizer: DeletionAuthorizer::new(secret)?,
            id_length,
            max_attempts: DEFAULT_MAX_ID_ATTEMPTS,
        })
    }

    /// Override the collision retry budget. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Open the configured backend and load the server secret.
    pub async fn from_config(config: &StaticConfig) -> Result<Self> {
        let secret = resolve_secret(&config.store)?;
        let storage = StorageFactory::create(config).await?;
        Ok(Self::new(storage, secret, config.store.id_length)?
            .with_max_attempts(config.store.max_id_attempts))
    }

    pub fn backend_name(&self) -> &'static str {
        self.storage.backend_name()
    }

    /// Persist `entry` and return its id with the matching deletion token.
    ///
    /// A non-empty `given_id` gets exactly one attempt. Otherwise random ids
    /// are tried until one is free or the retry budget is spent.
    pub async fn create_entry(
        &self,
        mut entry: Entry,
        given_id: Option<&str>,
        password: Option<&str>,
    ) -> Result<(String, DeletionToken)> {
        entry.public.url = normalize_url(&entry.public.url);
        validate_url(&entry.public.url)?;

        entry.password = process_new_password(password)?;
        entry.public.created_on = Utc::now();
        entry.public.visit_count = 0;
        entry.public.last_visit = None;

        let owner = entry.owner_key();

        let id = match given_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                self.storage.create(&entry, id, &owner).await?;
                id.to_string()
            }
            None => self.create_with_random_id(&entry, &owner).await?,
        };

        info!("Created entry '{}' -> '{}'", id, entry.public.url);
        let token = self.authorizer.issue(&id);
        Ok((id, token))
    }

    async fn create_with_random_id(&self, entry: &Entry, owner: &str) -> Result<String> {
        for attempt in 1..=self.max_attempts {
            let id = generate_random_id(self.id_length)?;
            match self.storage.create(entry, &id, owner).await {
                Ok(()) => return Ok(id),
                Err(StoreError::AlreadyExists(_)) => {
                    debug!(
                        "ID '{}' is taken (attempt {}/{})",
                        id, attempt, self.max_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::generation_exhausted(format!(
            "no free id of length {} after {} attempts",
            self.id_length, self.max_attempts
        )))
    }

    pub async fn get_entry_by_id(&self, id: &str) -> Result<Entry> {
        if id.is_empty() {
            return Err(StoreError::not_found("empty id"));
        }
        self.storage.get_by_id(id).await
    }

    /// Fetch an entry for redirection and count the access.
    ///
    /// Expired entries fail with [`StoreError::Expired`] and are left
    /// untouched. The returned entry already includes this access.
    pub async fn get_entry_and_increase(&self, id: &str) -> Result<Entry> {
        let mut entry = self.get_entry_by_id(id).await?;

        let now = Utc::now();
        if entry.is_expired_at(now) {
            return Err(StoreError::expired(format!("entry '{}' has expired", id)));
        }

        self.storage.increase_visit_counter(id).await?;

        entry.public.visit_count += 1;
        entry.public.last_visit = Some(now);
        Ok(entry)
    }

    /// Append a visitor record and return the generated visit id.
    pub async fn register_visit(&self, id: &str, visitor: &Visitor) -> Result<String> {
        let visit_id = Uuid::new_v4().to_string();
        info!(
            client_ip = %visitor.ip,
            entry = %id,
            visit = %visit_id,
            "New redirect"
        );
        self.storage
            .register_visitor(id, &visit_id, visitor)
            .await?;
        Ok(visit_id)
    }

    /// The redirect path: count the access, then log the visitor.
    ///
    /// A failed visitor registration does not fail the redirect.
    pub async fn record_visit(&self, id: &str, visitor: &Visitor) -> Result<Entry> {
        let entry = self.get_entry_and_increase(id).await?;
        if let Err(e) = self.register_visit(id, visitor).await {
            warn!("Could not register visitor for '{}': {}", id, e);
        }
        Ok(entry)
    }

    pub async fn get_visitors(&self, id: &str) -> Result<Vec<Visitor>> {
        if id.is_empty() {
            return Err(StoreError::not_found("empty id"));
        }
        self.storage.get_visitors(id).await
    }

    /// Delete an entry if `token` is its deletion token.
    pub async fn delete_entry(&self, id: &str, token: &[u8]) -> Result<()> {
        if !self.authorizer.verify(id, token) {
            warn!("Rejected deletion of '{}': token mismatch", id);
            return Err(StoreError::authorization_failed(format!(
                "deletion token does not match entry '{}'",
                id
            )));
        }

        self.storage.delete(id).await?;
        info!("Deleted entry '{}'", id);
        Ok(())
    }

    /// Recompute the deletion token for `id`.
    pub fn deletion_token(&self, id: &str) -> DeletionToken {
        self.authorizer.issue(id)
    }

    pub async fn get_owner_entries(
        &self,
        provider: &str,
        owner_id: &str,
    ) -> Result<HashMap<String, Entry>> {
        self.storage
            .get_entries_for_owner(&owner_key(provider, owner_id))
            .await
    }

    pub async fn get_all_entries(&self) -> Result<HashMap<String, Entry>> {
        self.storage.get_all_entries().await
    }

    /// Check `password` against a gated entry. Ungated entries always pass.
    pub fn check_password(&self, entry: &Entry, password: &str) -> Result<bool> {
        match entry.password.as_deref() {
            Some(hash) => verify_password(password, hash),
            None => Ok(true),
        }
    }

    pub async fn close(&self) -> Result<()> {
        self.storage.close().await
    }
}
