//! Deletion capability tokens
//!
//! A token is `HMAC-SHA512(secret, id)`. It is never stored: verification
//! recomputes the MAC and compares in constant time, so anyone holding the
//! token for an id may delete that entry and nobody else can.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::errors::{Result, StoreError};

type HmacSha512 = Hmac<Sha512>;

/// MAC bytes handed back to an entry's creator.
#[derive(Clone, PartialEq, Eq)]
pub struct DeletionToken(Vec<u8>);

impl DeletionToken {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// URL-safe text form, suitable for a query parameter or path segment.
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map(Self)
            .map_err(|e| {
                StoreError::authorization_failed(format!("malformed deletion token: {}", e))
            })
    }
}

impl From<Vec<u8>> for DeletionToken {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for DeletionToken {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for DeletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

// 避免在日志中泄露令牌
impl fmt::Debug for DeletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeletionToken(<{} bytes>)", self.0.len())
    }
}

/// Issues and checks deletion tokens for a single server secret.
#[derive(Clone)]
pub struct DeletionAuthorizer {
    mac: HmacSha512,
}

impl DeletionAuthorizer {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(StoreError::config("deletion secret must not be empty"));
        }
        let mac = HmacSha512::new_from_slice(secret)
            .map_err(|e| StoreError::config(format!("unusable deletion secret: {}", e)))?;
        Ok(Self { mac })
    }

    pub fn issue(&self, id: &str) -> DeletionToken {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        DeletionToken(mac.finalize().into_bytes().to_vec())
    }

    /// Recompute the token for `id` and compare it with `supplied`.
    pub fn verify(&self, id: &str, supplied: &[u8]) -> bool {
        let expected = self.issue(id);
        expected.as_bytes().ct_eq(supplied).into()
    }
}

impl fmt::Debug for DeletionAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeletionAuthorizer").finish_non_exhaustive()
    }
}
