use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::core::error::Error;
use crate::store::{KvStore, Ttl};

pub const DELIMITER: char = ':';

const RESERVED: [char; 6] = [DELIMITER, '*', '?', '[', ']', '\\'];

/// Rejects values that would make keys or scan patterns ambiguous.
pub fn validate_segment(segment: &str) -> Result<(), Error> {
    if segment.is_empty() || segment.contains(RESERVED) {
        return Err(Error::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

fn is_segment(segment: &str) -> bool {
    validate_segment(segment).is_ok()
}

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

/// A key of this namespace split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub id: Option<String>,
    pub token: String,
}

/// Maps tokens and ids onto `{namespace}:{id}:{token}` and `{namespace}:{token}` keys.
///
/// Lookups by token are a point read for anonymous records and a scan for
/// identity records; lookups by id are always a scan. Neither is consistent with
/// concurrent writers.
#[derive(Debug, Clone)]
pub struct SessionIndex<S> {
    store: S,
    namespace: String,
    namespace_glob: String,
}

impl<S: KvStore> SessionIndex<S> {
    pub fn new(store: S, namespace: &str) -> Result<Self, Error> {
        if namespace.is_empty() || namespace.contains(DELIMITER) {
            return Err(Error::InvalidSegment(namespace.to_string()));
        }

        Ok(Self {
            store,
            namespace: namespace.to_string(),
            namespace_glob: escape_glob(namespace),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn key(&self, id: Option<&str>, token: &str) -> String {
        match id {
            Some(id) => format!("{}{DELIMITER}{id}{DELIMITER}{token}", self.namespace),
            None => format!("{}{DELIMITER}{token}", self.namespace),
        }
    }

    /// Splits a key of this namespace; anything else yields `None`.
    pub fn parse_key(&self, key: &str) -> Option<SessionKey> {
        let mut segments = key.split(DELIMITER);
        if segments.next()? != self.namespace {
            return None;
        }

        let parts: Vec<&str> = segments.collect();
        match parts.as_slice() {
            [token] if is_segment(token) => Some(SessionKey {
                id: None,
                token: token.to_string(),
            }),
            [id, token] if is_segment(id) && is_segment(token) => Some(SessionKey {
                id: Some(id.to_string()),
                token: token.to_string(),
            }),
            _ => None,
        }
    }

    /// Writes a session record, returning its key.
    ///
    /// `ttl <= 0` stores the record without expiry. A token already recorded
    /// under a different id is refused; checking that scans the namespace, so
    /// each write costs time proportional to the number of keys in it.
    #[instrument(skip(self, extra))]
    pub async fn put(
        &self,
        id: Option<&str>,
        token: &str,
        extra: Option<&str>,
        ttl: i64,
    ) -> Result<String, Error> {
        if let Some(id) = id {
            validate_segment(id)?;
        }
        validate_segment(token)?;

        let key = self.key(id, token);

        if let Some(existing) = self.find_key_by_token(token).await? {
            if existing != key {
                tracing::warn!(%existing, "token already issued under another key");
                return Err(Error::TokenConflict);
            }
        }

        let ttl = (ttl > 0).then_some(ttl as u64);
        self.store.set(&key, extra.unwrap_or_default(), ttl).await?;

        Ok(key)
    }

    /// Key holding `token`, if any.
    ///
    /// When foreign writers left several keys for one token the smallest key wins.
    pub async fn find_key_by_token(&self, token: &str) -> Result<Option<String>, Error> {
        if !is_segment(token) {
            return Ok(None);
        }

        let anonymous = self.key(None, token);
        if self.store.exists(&anonymous).await? {
            return Ok(Some(anonymous));
        }

        let pattern = format!("{}{DELIMITER}*{DELIMITER}{token}", self.namespace_glob);
        let mut keys: Vec<String> = self
            .store
            .scan(&pattern)
            .await?
            .into_iter()
            .filter(|key| {
                self.parse_key(key)
                    .is_some_and(|parsed| parsed.id.is_some() && parsed.token == token)
            })
            .collect();
        keys.sort();

        if keys.len() > 1 {
            tracing::warn!(count = keys.len(), "token resolves to several keys");
        }

        Ok(keys.into_iter().next())
    }

    /// All keys recorded for `id`, sorted.
    pub async fn find_keys_by_id(&self, id: &str) -> Result<Vec<String>, Error> {
        if !is_segment(id) {
            return Ok(Vec::new());
        }

        let pattern = format!("{}{DELIMITER}{id}{DELIMITER}*", self.namespace_glob);
        self.scan_keys(&pattern).await
    }

    /// Every well-formed key of the namespace, sorted.
    pub async fn find_all_keys(&self) -> Result<Vec<String>, Error> {
        let pattern = format!("{}{DELIMITER}*", self.namespace_glob);
        self.scan_keys(&pattern).await
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, Error> {
        let mut keys: Vec<String> = self
            .store
            .scan(pattern)
            .await?
            .into_iter()
            .filter(|key| self.parse_key(key).is_some())
            .collect();
        keys.sort();
        Ok(keys)
    }

    pub async fn remove(&self, token: &str) -> Result<bool, Error> {
        match self.find_key_by_token(token).await? {
            Some(key) => Ok(self.store.delete(&key).await?),
            None => Ok(false),
        }
    }

    /// Deletes every record of `id` in one call, returning how many were removed.
    pub async fn remove_all(&self, id: &str) -> Result<u64, Error> {
        let keys = self.find_keys_by_id(id).await?;
        Ok(self.store.delete_multi(&keys).await?)
    }

    /// Sets the expiry of the record holding `token`; `ttl <= 0` deletes it.
    pub async fn touch(&self, token: &str, ttl: i64) -> Result<bool, Error> {
        match self.find_key_by_token(token).await? {
            Some(key) => Ok(self.store.expire(&key, ttl).await?),
            None => Ok(false),
        }
    }

    pub async fn touch_at(&self, token: &str, at: DateTime<Utc>) -> Result<bool, Error> {
        match self.find_key_by_token(token).await? {
            Some(key) => Ok(self.store.expire_at(&key, at).await?),
            None => Ok(false),
        }
    }

    pub async fn persist(&self, token: &str) -> Result<bool, Error> {
        match self.find_key_by_token(token).await? {
            Some(key) => Ok(self.store.persist(&key).await?),
            None => Ok(false),
        }
    }

    pub async fn read_expiry(&self, key: &str) -> Result<Ttl, Error> {
        Ok(self.store.ttl(key).await?)
    }
}
