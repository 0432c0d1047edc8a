//! shortvault - storage core of a URL shortener
//!
//! Maps short random ids to target URLs, counts and logs visits, and lets
//! the creator of an entry delete it with a stateless HMAC token.
//!
//! # Features
//! - **cli**: the `shortvault` binary (default)
//!
//! # Architecture
//! - `storage`: the [`storage::Storage`] trait with an embedded redb backend
//!   and a Redis backend
//! - `services`: [`services::EntryStore`] and the deletion authorizer
//! - `config`: TOML + environment configuration and the server secret
//! - `system`: logging setup
//! - `utils`: id generation, URL validation, password hashing, time parsing

pub mod config;
pub mod errors;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
