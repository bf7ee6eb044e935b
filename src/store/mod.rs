//! Narrow view of the key-value store holding session records.

pub mod memory;
pub mod redis;

use std::future::Future;

use chrono::{DateTime, Utc};

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Keys fetched per `SCAN` round.
pub const SCAN_COUNT: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] regex::Error),
    #[error("Invalid expire time: {0}s")]
    InvalidExpire(u64),
}

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Expires(u64),
    Persistent,
    Missing,
}

impl Ttl {
    /// Reads the `TTL` reply convention: seconds, `-1` for no expiry, `-2` for a missing key.
    pub fn from_reply(reply: i64) -> Self {
        match reply {
            -1 => Ttl::Persistent,
            n if n < 0 => Ttl::Missing,
            n => Ttl::Expires(n as u64),
        }
    }

    pub fn as_reply(self) -> i64 {
        match self {
            Ttl::Expires(secs) => secs as i64,
            Ttl::Persistent => -1,
            Ttl::Missing => -2,
        }
    }

    pub fn exists(self) -> bool {
        !matches!(self, Ttl::Missing)
    }

    /// Expiry to reuse when rewriting a value, `None` meaning no expiry.
    pub fn as_seconds(self) -> Option<u64> {
        match self {
            Ttl::Expires(secs) => Some(secs),
            _ => None,
        }
    }
}

/// Operations the session index needs from a store.
///
/// Values are plain strings. Expiry semantics follow Redis: a non-positive
/// `expire` deletes the key, and every boolean reports whether the key existed.
pub trait KvStore: Clone + Send + Sync + 'static {
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Deletes `keys` in one round trip, returning how many existed.
    fn delete_multi(&self, keys: &[String])
    -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// All keys matching a glob `pattern` (`*`, `?`, `[...]`, `\` escapes).
    fn scan(&self, pattern: &str) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    fn expire(&self, key: &str, seconds: i64)
    -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn expire_at(
        &self,
        key: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Clears the expiry, returning false if the key is missing or had none.
    fn persist(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn ttl(&self, key: &str) -> impl Future<Output = Result<Ttl, StoreError>> + Send;

    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<u64>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrites an existing key keeping its expiry; false if the key is missing.
    fn replace(&self, key: &str, value: &str)
    -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn get_multi(
        &self,
        keys: &[String],
    ) -> impl Future<Output = Result<Vec<Option<String>>, StoreError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_reply_convention() {
        assert_eq!(Ttl::from_reply(100), Ttl::Expires(100));
        assert_eq!(Ttl::from_reply(0), Ttl::Expires(0));
        assert_eq!(Ttl::from_reply(-1), Ttl::Persistent);
        assert_eq!(Ttl::from_reply(-2), Ttl::Missing);

        for reply in [42, -1, -2] {
            assert_eq!(Ttl::from_reply(reply).as_reply(), reply);
        }
        assert!(!Ttl::Missing.exists());
        assert_eq!(Ttl::Persistent.as_seconds(), None);
    }
}
