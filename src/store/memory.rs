use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::store::{KvStore, StoreError, Ttl};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }

    fn ttl(&self, now: Instant) -> Ttl {
        match self.expires_at {
            None => Ttl::Persistent,
            // rounded up so a fresh 100s key reports 100, like TTL does
            Some(at) => Ttl::Expires((at - now).as_millis().div_ceil(1000) as u64),
        }
    }
}

/// In-process [`KvStore`] with the same expiry and scan semantics as Redis.
///
/// Expired entries are dropped lazily when touched. Meant for tests and single
/// process deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Deadline `seconds` from `now`; out-of-range lifetimes are refused like Redis does.
fn deadline(now: Instant, seconds: u64) -> Result<Instant, StoreError> {
    now.checked_add(Duration::from_secs(seconds))
        .ok_or(StoreError::InvalidExpire(seconds))
}

/// Translates a Redis glob into an anchored regex.
pub(crate) fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            '[' => {
                out.push('[');
                if let Some(first) = chars.next() {
                    match first {
                        '^' => out.push('^'),
                        ']' => out.push_str("\\]"),
                        other => out.push_str(&class_char(other)),
                    }
                }
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    match inner {
                        '-' => out.push('-'),
                        other => out.push_str(&class_char(other)),
                    }
                }
                out.push(']');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push('$');
    Regex::new(&out)
}

fn class_char(c: char) -> String {
    match c {
        '\\' | '[' | ']' | '^' | '&' | '~' => format!("\\{c}"),
        other => other.to_string(),
    }
}

impl KvStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.ttl(key).await?.exists())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        Ok(entries.remove(key).is_some_and(|e| e.is_live(now)))
    }

    async fn delete_multi(&self, keys: &[String]) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        Ok(keys
            .iter()
            .filter(|key| entries.remove(key.as_str()).is_some_and(|e| e.is_live(now)))
            .count() as u64)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();

        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.is_live(now));

        Ok(entries
            .keys()
            .filter(|key| matcher.is_match(key))
            .cloned()
            .collect())
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<bool, StoreError> {
        let now = Instant::now();
        let expires_at = match seconds {
            s if s > 0 => Some(deadline(now, s as u64)?),
            _ => None,
        };
        let mut entries = self.entries.lock().await;

        let live = entries.get(key).is_some_and(|e| e.is_live(now));
        if !live {
            entries.remove(key);
            return Ok(false);
        }

        match expires_at {
            None => {
                entries.remove(key);
            }
            Some(at) => {
                if let Some(entry) = entries.get_mut(key) {
                    entry.expires_at = Some(at);
                }
            }
        }
        Ok(true)
    }

    async fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let seconds = (at - Utc::now()).num_seconds();
        self.expire(key, seconds).await
    }

    async fn persist(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => Ok(entry.expires_at.take().is_some()),
            _ => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.ttl(now)))
        {
            Some(Some(ttl)) => Ok(ttl),
            Some(None) => {
                entries.remove(key);
                Ok(Ttl::Missing)
            }
            None => Ok(Ttl::Missing),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<(), StoreError> {
        let now = Instant::now();
        let expires_at = ttl.map(|secs| deadline(now, secs)).transpose()?;
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn replace(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.value = value.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn get_multi(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        Ok(keys
            .iter()
            .map(|key| {
                entries
                    .get(key.as_str())
                    .filter(|e| e.is_live(now))
                    .map(|e| e.value.clone())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_translation() {
        let any = glob_to_regex("tt:*:abc").unwrap();
        assert!(any.is_match("tt:42:abc"));
        assert!(any.is_match("tt::abc"));
        assert!(!any.is_match("tt:42:abcd"));

        let one = glob_to_regex("h?llo").unwrap();
        assert!(one.is_match("hello"));
        assert!(!one.is_match("heello"));

        let class = glob_to_regex("h[ae]llo").unwrap();
        assert!(class.is_match("hallo"));
        assert!(!class.is_match("hillo"));

        let negated = glob_to_regex("h[^e]llo").unwrap();
        assert!(negated.is_match("hallo"));
        assert!(!negated.is_match("hello"));

        let range = glob_to_regex("[a-c]x").unwrap();
        assert!(range.is_match("bx"));
        assert!(!range.is_match("dx"));

        let escaped = glob_to_regex(r"a\*b.c").unwrap();
        assert!(escaped.is_match("a*b.c"));
        assert!(!escaped.is_match("aXb.c"));
        assert!(!escaped.is_match("a*bxc"));
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store.set("a", "1", None).await.unwrap();
        store.set("b", "2", Some(100)).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(
            store
                .get_multi(&["a".into(), "x".into(), "b".into()])
                .await
                .unwrap(),
            vec![Some("1".to_string()), None, Some("2".to_string())]
        );

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(
            store
                .delete_multi(&["a".into(), "b".into()])
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_ttl_lifecycle() {
        let store = MemoryStore::new();
        assert_eq!(store.ttl("k").await.unwrap(), Ttl::Missing);

        store.set("k", "", Some(100)).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), Ttl::Expires(100));

        assert!(store.persist("k").await.unwrap());
        assert!(!store.persist("k").await.unwrap());
        assert_eq!(store.ttl("k").await.unwrap(), Ttl::Persistent);

        assert!(store.expire("k", 10).await.unwrap());
        assert!(matches!(store.ttl("k").await.unwrap(), Ttl::Expires(1..=10)));

        assert!(store.replace("k", "v").await.unwrap());
        assert!(matches!(store.ttl("k").await.unwrap(), Ttl::Expires(1..=10)));

        // non-positive expiry deletes
        assert!(store.expire("k", 0).await.unwrap());
        assert!(!store.exists("k").await.unwrap());
        assert!(!store.replace("k", "v").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryStore::new();
        store.set("short", "", Some(1)).await.unwrap();
        store.set("long", "", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(!store.exists("short").await.unwrap());
        assert_eq!(store.scan("*").await.unwrap(), vec!["long".to_string()]);
    }

    #[tokio::test]
    async fn test_out_of_range_expiry_is_refused() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set("k", "", Some(u64::MAX)).await,
            Err(StoreError::InvalidExpire(u64::MAX))
        ));
        assert!(!store.exists("k").await.unwrap());

        store.set("k", "v", Some(100)).await.unwrap();
        assert!(matches!(
            store.expire("k", i64::MAX).await,
            Err(StoreError::InvalidExpire(_))
        ));
        assert!(matches!(store.ttl("k").await.unwrap(), Ttl::Expires(1..=100)));
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_expire_at() {
        let store = MemoryStore::new();
        store.set("k", "", None).await.unwrap();

        let at = Utc::now() + chrono::Duration::seconds(60);
        assert!(store.expire_at("k", at).await.unwrap());
        assert!(matches!(store.ttl("k").await.unwrap(), Ttl::Expires(50..=60)));
    }
}
