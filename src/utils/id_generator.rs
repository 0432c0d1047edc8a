//! Short ID generation
//!
//! IDs are drawn from the operating system CSPRNG and restricted to ASCII
//! letters so they are unguessable and safe as a URL path segment.

use rand_core::{OsRng, RngCore};

use crate::errors::{Result, StoreError};

const BATCH: usize = 32;

/// Generate a random alphabetic ID of exactly `length` characters.
///
/// Each random byte is reduced to the range 0..128 and kept only when it is
/// an ASCII letter, so every accepted letter is equally likely. A failing
/// random source is reported as is; there is no internal retry.
pub fn generate_random_id(length: usize) -> Result<String> {
    let mut id = String::with_capacity(length);
    let mut buf = [0u8; BATCH];

    while id.len() < length {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| StoreError::random_source(format!("could not read random bytes: {}", e)))?;

        for c in buf.iter().map(|b| (b & 0x7f) as char) {
            if id.len() == length {
                break;
            }
            if c.is_ascii_alphabetic() {
                id.push(c);
            }
        }
    }

    Ok(id)
}
