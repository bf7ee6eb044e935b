use std::marker::PhantomData;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::codec::{TokenKind, token};
use crate::core::error::Error;
use crate::session::context::RequestHeaders;
use crate::session::index::SessionIndex;
use crate::session::info::TokenInfo;
use crate::session::{SessionId, Settings};
use crate::store::{KvStore, Ttl};
use crate::utils::snowflake::{Snowflake, SnowflakeParts};

/// Issues, resolves and expires session tokens.
///
/// Every operation goes straight to the store; the only in-process state is
/// configuration and the id generator, so clones can be shared between request
/// handlers freely. Operations suffixed `_current` read the token from the
/// configured header of the request being served.
pub struct TinyToken<S, I = u64> {
    index: SessionIndex<S>,
    settings: Arc<Settings>,
    snowflake: Arc<Snowflake>,
    _id: PhantomData<fn() -> I>,
}

impl<S: Clone, I> Clone for TinyToken<S, I> {
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
            settings: self.settings.clone(),
            snowflake: self.snowflake.clone(),
            _id: PhantomData,
        }
    }
}

impl<S: std::fmt::Debug, I> std::fmt::Debug for TinyToken<S, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TinyToken")
            .field("index", &self.index)
            .field("header", &self.settings.header)
            .field("timeout", &self.settings.timeout)
            .field("token_kind", &self.settings.token_kind)
            .finish()
    }
}

impl<S: KvStore, I: SessionId> TinyToken<S, I> {
    pub fn new(store: S, settings: Settings) -> Result<Self, Error> {
        let index = SessionIndex::new(store, &settings.prefix)?;
        let snowflake = Snowflake::new(settings.machine_id)?;

        tracing::info!(
            prefix = %settings.prefix,
            header = %settings.header,
            timeout = settings.timeout,
            token_kind = ?settings.token_kind,
            "session facade ready"
        );

        Ok(Self {
            index,
            settings: Arc::new(settings),
            snowflake: Arc::new(snowflake),
            _id: PhantomData,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn index(&self) -> &SessionIndex<S> {
        &self.index
    }

    /// Fresh token for `id` in the configured shape.
    ///
    /// Identity-bearing tokens need an id that embeds as 64 bits; others fall
    /// back to the anonymous shape.
    pub fn generate_token(&self, id: Option<&I>) -> String {
        let serial = self.snowflake.next();
        match (self.settings.token_kind, id.and_then(SessionId::embedded)) {
            (TokenKind::Identity, Some(app_id)) => token::encode_with_id(serial, app_id),
            _ => token::encode(serial),
        }
    }

    /// Issues a token for `id` with the default timeout.
    pub async fn set_token(&self, id: &I) -> Result<String, Error> {
        self.set_token_with_timeout(id, self.settings.timeout).await
    }

    /// Issues a token for `id`; `timeout <= 0` never expires.
    pub async fn set_token_with_timeout(&self, id: &I, timeout: i64) -> Result<String, Error> {
        self.issue_token(id, None, timeout).await
    }

    /// Issues a token for `id` together with its extra payload in a single write.
    pub async fn issue_token(
        &self,
        id: &I,
        extra: Option<&str>,
        timeout: i64,
    ) -> Result<String, Error> {
        let token = self.generate_token(Some(id));
        self.write(Some(id), &token, extra, timeout).await?;
        Ok(token)
    }

    /// Records a caller-chosen token for `id`.
    pub async fn set_token_as(&self, token: &str, id: &I, timeout: i64) -> Result<(), Error> {
        self.write(Some(id), token, None, timeout).await
    }

    pub async fn set_token_with_extra(
        &self,
        token: &str,
        id: &I,
        extra: &str,
        timeout: i64,
    ) -> Result<(), Error> {
        self.write(Some(id), token, Some(extra), timeout).await
    }

    /// Issues a token bound to no id.
    pub async fn set_anonymous_token(&self, timeout: i64) -> Result<String, Error> {
        let token = self.generate_token(None);
        self.write(None, &token, None, timeout).await?;
        Ok(token)
    }

    #[instrument(skip_all)]
    async fn write(
        &self,
        id: Option<&I>,
        token: &str,
        extra: Option<&str>,
        timeout: i64,
    ) -> Result<(), Error> {
        let id = id.map(ToString::to_string);
        let key = self.index.put(id.as_deref(), token, extra, timeout).await?;

        tracing::debug!(%key, timeout, "token issued");

        Ok(())
    }

    /// Token sent with the current request, valid or not.
    pub fn get_token<C: RequestHeaders + ?Sized>(&self, ctx: &C) -> Result<Option<String>, Error> {
        Ok(ctx
            .header(&self.settings.header)?
            .filter(|token| !token.is_empty()))
    }

    /// Token sent with the current request if it resolves to a live session.
    pub async fn get_token_valid<C: RequestHeaders + ?Sized>(
        &self,
        ctx: &C,
    ) -> Result<Option<String>, Error> {
        match self.get_token(ctx)? {
            Some(token) if self.exists_by_token(&token).await? => Ok(Some(token)),
            _ => Ok(None),
        }
    }

    pub async fn exists_current<C: RequestHeaders + ?Sized>(&self, ctx: &C) -> Result<bool, Error> {
        Ok(self.get_token_valid(ctx).await?.is_some())
    }

    pub async fn exists_by_token(&self, token: &str) -> Result<bool, Error> {
        Ok(self.index.find_key_by_token(token).await?.is_some())
    }

    pub async fn exists_by_id(&self, id: &I) -> Result<bool, Error> {
        Ok(!self.index.find_keys_by_id(&id.to_string()).await?.is_empty())
    }

    /// Live tokens of `id`.
    pub async fn get_tokens(&self, id: &I) -> Result<Vec<String>, Error> {
        let keys = self.index.find_keys_by_id(&id.to_string()).await?;
        Ok(keys
            .iter()
            .filter_map(|key| self.index.parse_key(key))
            .map(|parsed| parsed.token)
            .collect())
    }

    /// Id recorded for `token`; `None` for unknown or anonymous tokens.
    pub async fn get_id(&self, token: &str) -> Result<Option<I>, Error> {
        let Some(key) = self.index.find_key_by_token(token).await? else {
            return Ok(None);
        };

        Ok(self
            .index
            .parse_key(&key)
            .and_then(|parsed| parsed.id)
            .and_then(|id| id.parse().ok()))
    }

    pub async fn get_id_current<C: RequestHeaders + ?Sized>(
        &self,
        ctx: &C,
    ) -> Result<Option<I>, Error> {
        match self.get_token(ctx)? {
            Some(token) => self.get_id(&token).await,
            None => Ok(None),
        }
    }

    /// Application id embedded in an identity-bearing token, without a store lookup.
    ///
    /// Says nothing about whether the token is still live.
    pub fn id_from_token(token: &str) -> Result<Option<I>, Error> {
        if token.len() != token::IDENTITY_TOKEN_LEN {
            token::decode(token)?;
            return Ok(None);
        }
        let (_, app_id) = token::decode_with_id(token)?;
        Ok(I::from_embedded(app_id))
    }

    /// Splits the generated serial carried by a token into its parts.
    pub fn parse(token: &str) -> Result<SnowflakeParts, Error> {
        let serial = if token.len() == token::IDENTITY_TOKEN_LEN {
            token::decode_with_id(token)?.0
        } else {
            token::decode(token)?
        };
        Ok(Snowflake::parse(serial))
    }

    #[instrument(skip(self))]
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, Error> {
        let deleted = self.index.remove(token).await?;
        tracing::debug!(deleted, "delete by token");
        Ok(deleted)
    }

    pub async fn delete_current<C: RequestHeaders + ?Sized>(&self, ctx: &C) -> Result<bool, Error> {
        match self.get_token(ctx)? {
            Some(token) => self.delete_by_token(&token).await,
            None => Ok(false),
        }
    }

    /// Removes every session of `id`, returning how many existed.
    #[instrument(skip_all)]
    pub async fn delete_by_id(&self, id: &I) -> Result<u64, Error> {
        let deleted = self.index.remove_all(&id.to_string()).await?;
        tracing::debug!(deleted, "delete by id");
        Ok(deleted)
    }

    /// Sets the remaining lifetime; `timeout <= 0` ends the session now.
    pub async fn expire(&self, token: &str, timeout: i64) -> Result<bool, Error> {
        self.index.touch(token, timeout).await
    }

    /// Resets the lifetime to the configured default.
    ///
    /// A non-positive default means sessions never expire, so the session is
    /// made persistent instead of being ended.
    pub async fn expire_default(&self, token: &str) -> Result<bool, Error> {
        if self.settings.timeout > 0 {
            return self.expire(token, self.settings.timeout).await;
        }

        Ok(self.persist(token).await? || self.exists_by_token(token).await?)
    }

    pub async fn expire_at(&self, token: &str, at: DateTime<Utc>) -> Result<bool, Error> {
        self.index.touch_at(token, at).await
    }

    pub async fn expire_current<C: RequestHeaders + ?Sized>(
        &self,
        ctx: &C,
        timeout: Option<i64>,
    ) -> Result<bool, Error> {
        match (self.get_token(ctx)?, timeout) {
            (Some(token), Some(timeout)) => self.expire(&token, timeout).await,
            (Some(token), None) => self.expire_default(&token).await,
            (None, _) => Ok(false),
        }
    }

    pub async fn persist(&self, token: &str) -> Result<bool, Error> {
        self.index.persist(token).await
    }

    pub async fn persist_current<C: RequestHeaders + ?Sized>(&self, ctx: &C) -> Result<bool, Error> {
        match self.get_token(ctx)? {
            Some(token) => self.persist(&token).await,
            None => Ok(false),
        }
    }

    pub async fn get_extra(&self, token: &str) -> Result<Option<String>, Error> {
        let Some(key) = self.index.find_key_by_token(token).await? else {
            return Ok(None);
        };

        Ok(self
            .index
            .store()
            .get(&key)
            .await?
            .filter(|extra| !extra.is_empty()))
    }

    pub async fn get_extra_current<C: RequestHeaders + ?Sized>(
        &self,
        ctx: &C,
    ) -> Result<Option<String>, Error> {
        match self.get_token(ctx)? {
            Some(token) => self.get_extra(&token).await,
            None => Ok(None),
        }
    }

    /// Replaces the extra payload keeping the remaining lifetime.
    ///
    /// By default this reads the expiry and writes value and expiry back, so a
    /// session expiring or deleted in between can be written again. With
    /// `strict_extra_update` the store overwrites only a live key.
    #[instrument(skip(self, extra))]
    pub async fn set_extra(&self, token: &str, extra: &str) -> Result<bool, Error> {
        let Some(key) = self.index.find_key_by_token(token).await? else {
            return Ok(false);
        };
        let store = self.index.store();

        if self.settings.strict_extra_update {
            return Ok(store.replace(&key, extra).await?);
        }

        let ttl = match self.index.read_expiry(&key).await? {
            Ttl::Missing | Ttl::Expires(0) => return Ok(false),
            ttl => ttl.as_seconds(),
        };
        store.set(&key, extra, ttl).await?;

        Ok(true)
    }

    pub async fn set_extra_current<C: RequestHeaders + ?Sized>(
        &self,
        ctx: &C,
        extra: &str,
    ) -> Result<bool, Error> {
        match self.get_token(ctx)? {
            Some(token) => self.set_extra(&token, extra).await,
            None => Ok(false),
        }
    }

    /// Id and remaining lifetime of `token`.
    pub async fn get_info_by_token(&self, token: &str) -> Result<Option<TokenInfo<I>>, Error> {
        self.info_by_token(token, false).await
    }

    pub async fn get_info_extra_by_token(
        &self,
        token: &str,
    ) -> Result<Option<TokenInfo<I>>, Error> {
        self.info_by_token(token, true).await
    }

    pub async fn get_info_current<C: RequestHeaders + ?Sized>(
        &self,
        ctx: &C,
    ) -> Result<Option<TokenInfo<I>>, Error> {
        match self.get_token(ctx)? {
            Some(token) => self.get_info_extra_by_token(&token).await,
            None => Ok(None),
        }
    }

    async fn info_by_token(
        &self,
        token: &str,
        with_extra: bool,
    ) -> Result<Option<TokenInfo<I>>, Error> {
        let Some(key) = self.index.find_key_by_token(token).await? else {
            return Ok(None);
        };

        let mut infos = self.collect_info(vec![key], with_extra, |_| true).await?;
        Ok(infos.pop())
    }

    pub async fn get_info_by_id(&self, id: &I) -> Result<Vec<TokenInfo<I>>, Error> {
        let keys = self.index.find_keys_by_id(&id.to_string()).await?;
        self.collect_info(keys, false, |_| true).await
    }

    pub async fn get_info_extra_by_id(&self, id: &I) -> Result<Vec<TokenInfo<I>>, Error> {
        let keys = self.index.find_keys_by_id(&id.to_string()).await?;
        self.collect_info(keys, true, |_| true).await
    }

    /// Every session of the namespace.
    #[instrument(skip_all)]
    pub async fn get_info(&self) -> Result<Vec<TokenInfo<I>>, Error> {
        let keys = self.index.find_all_keys().await?;
        self.collect_info(keys, false, |_| true).await
    }

    /// Sessions that never expire.
    #[instrument(skip_all)]
    pub async fn get_info_persist(&self) -> Result<Vec<TokenInfo<I>>, Error> {
        let keys = self.index.find_all_keys().await?;
        self.collect_info(keys, false, |ttl| ttl == Ttl::Persistent)
            .await
    }

    pub async fn get_token_list(&self) -> Result<Vec<String>, Error> {
        let keys = self.index.find_all_keys().await?;
        Ok(keys
            .iter()
            .filter_map(|key| self.index.parse_key(key))
            .map(|parsed| parsed.token)
            .collect())
    }

    /// Distinct ids holding at least one session.
    pub async fn get_ids(&self) -> Result<Vec<I>, Error> {
        let keys = self.index.find_all_keys().await?;
        let mut ids: Vec<String> = keys
            .iter()
            .filter_map(|key| self.index.parse_key(key)?.id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids.into_iter().filter_map(|id| id.parse().ok()).collect())
    }

    /// Reads expiry (and optionally extras) for `keys`, dropping keys that
    /// vanished, fail `keep`, or do not parse as this namespace with id type `I`.
    async fn collect_info(
        &self,
        keys: Vec<String>,
        with_extra: bool,
        keep: impl Fn(Ttl) -> bool,
    ) -> Result<Vec<TokenInfo<I>>, Error> {
        let mut kept = Vec::with_capacity(keys.len());
        let mut infos = Vec::with_capacity(keys.len());

        for key in keys {
            let Some(parsed) = self.index.parse_key(&key) else {
                continue;
            };
            let id = match parsed.id {
                Some(id) => match id.parse::<I>() {
                    Ok(id) => Some(id),
                    Err(_) => continue,
                },
                None => None,
            };

            let ttl = self.index.read_expiry(&key).await?;
            if !ttl.exists() || !keep(ttl) {
                continue;
            }

            infos.push(TokenInfo::new(id, parsed.token, ttl.as_reply()));
            kept.push(key);
        }

        if with_extra && !kept.is_empty() {
            let extras = self.index.store().get_multi(&kept).await?;
            infos = infos
                .into_iter()
                .zip(extras)
                .map(|(info, extra)| info.with_extra(extra))
                .collect();
        }

        Ok(infos)
    }

    /// Byte comparison against the configured credentials.
    pub fn is_correct(&self, username: &str, password: &str) -> bool {
        self.settings
            .credentials
            .as_ref()
            .is_some_and(|c| c.username == username && c.password == password)
    }

    /// Checks a `Basic base64(username:password)` header of the current request.
    pub fn is_correct_header<C: RequestHeaders + ?Sized>(&self, ctx: &C) -> Result<bool, Error> {
        let header = self.get_token(ctx)?.ok_or(Error::NoCredentials)?;
        let encoded = match header.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("basic") => rest.trim(),
            _ => header.trim(),
        };

        let decoded = STANDARD.decode(encoded)?;
        let Ok(decoded) = String::from_utf8(decoded) else {
            return Ok(false);
        };

        Ok(decoded
            .split_once(':')
            .is_some_and(|(username, password)| self.is_correct(username, password)))
    }
}
