//! Session records keyed by token in a shared key-value store.

pub mod context;
pub mod facade;
pub mod index;
pub mod info;

use std::fmt::Display;
use std::str::FromStr;

use crate::codec::TokenKind;

pub use self::context::RequestHeaders;
pub use self::facade::TinyToken;
pub use self::index::SessionIndex;
pub use self::info::TokenInfo;

/// Application identity a session belongs to.
///
/// The `Display` form becomes a key segment, so it must not contain `:` or
/// glob metacharacters. Integer ids can additionally be embedded into
/// identity-bearing tokens.
pub trait SessionId: Clone + Display + FromStr + Send + Sync + 'static {
    fn embedded(&self) -> Option<u64> {
        None
    }

    fn from_embedded(_value: u64) -> Option<Self> {
        None
    }
}

impl SessionId for u64 {
    fn embedded(&self) -> Option<u64> {
        Some(*self)
    }

    fn from_embedded(value: u64) -> Option<Self> {
        Some(value)
    }
}

impl SessionId for i64 {
    fn embedded(&self) -> Option<u64> {
        Some(*self as u64)
    }

    fn from_embedded(value: u64) -> Option<Self> {
        Some(value as i64)
    }
}

impl SessionId for u32 {
    fn embedded(&self) -> Option<u64> {
        Some(u64::from(*self))
    }

    fn from_embedded(value: u64) -> Option<Self> {
        u32::try_from(value).ok()
    }
}

impl SessionId for String {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Namespace prepended to every key.
    pub prefix: String,
    /// Request header carrying the token.
    pub header: String,
    /// Default expiry in seconds, `-1` for none.
    pub timeout: i64,
    pub token_kind: TokenKind,
    pub machine_id: u16,
    /// Rewrite extras with a single write-if-exists instead of read-then-write.
    pub strict_extra_update: bool,
    pub credentials: Option<Credentials>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: "tinytoken".into(),
            header: "Authorization".into(),
            timeout: 2_592_000,
            token_kind: TokenKind::Anonymous,
            machine_id: 0,
            strict_extra_update: false,
            credentials: None,
        }
    }
}
