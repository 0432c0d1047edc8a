//! Service layer
//!
//! Business logic shared by every front end that drives a store.

mod deletion;
mod entry_store;

pub use deletion::{DeletionAuthorizer, DeletionToken};
pub use entry_store::{DEFAULT_MAX_ID_ATTEMPTS, EntryStore};
