pub mod redb;
pub mod redis;

pub use redb::RedbStorage;
pub use redis::RedisStorage;
