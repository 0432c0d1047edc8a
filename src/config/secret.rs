//! Server secret used to key deletion tokens.

use std::fs;
use std::path::Path;

use rand_core::{OsRng, RngCore};
use tracing::{debug, info};

use super::StoreConfig;
use crate::errors::{Result, StoreError};

pub const SECRET_FILE: &str = "private.dat";
pub const SECRET_LEN: usize = 256;

/// The configured secret, or the contents of `<data_dir>/private.dat`.
pub fn resolve_secret(store: &StoreConfig) -> Result<Vec<u8>> {
    match store.secret.as_deref() {
        Some(secret) if !secret.is_empty() => Ok(secret.as_bytes().to_vec()),
        _ => load_or_create_secret(&store.data_dir),
    }
}

/// Read the key file, creating it with fresh random bytes if it is missing.
pub fn load_or_create_secret<P: AsRef<Path>>(data_dir: P) -> Result<Vec<u8>> {
    let dir = data_dir.as_ref();
    let path = dir.join(SECRET_FILE);

    if path.exists() {
        let secret = fs::read(&path).map_err(|e| {
            StoreError::file_operation(format!("could not read {}: {}", path.display(), e))
        })?;
        if secret.is_empty() {
            return Err(StoreError::config(format!("{} is empty", path.display())));
        }
        debug!("Loaded server secret from {}", path.display());
        return Ok(secret);
    }

    fs::create_dir_all(dir).map_err(|e| {
        StoreError::file_operation(format!(
            "could not create data directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut secret = vec![0u8; SECRET_LEN];
    OsRng
        .try_fill_bytes(&mut secret)
        .map_err(|e| StoreError::random_source(format!("could not generate secret: {}", e)))?;

    fs::write(&path, &secret).map_err(|e| {
        StoreError::file_operation(format!("could not write {}: {}", path.display(), e))
    })?;
    info!("Generated new server secret at {}", path.display());

    Ok(secret)
}
