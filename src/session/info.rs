use serde::Serialize;

/// Report record for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo<I> {
    pub id: Option<I>,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    /// Seconds until expiry, `-1` when the session never expires.
    pub timeout: i64,
}

impl<I> TokenInfo<I> {
    pub fn new(id: Option<I>, token: String, timeout: i64) -> Self {
        Self {
            id,
            token,
            extra: None,
            timeout,
        }
    }

    pub fn with_extra(mut self, extra: Option<String>) -> Self {
        self.extra = extra.filter(|e| !e.is_empty());
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.timeout == -1
    }
}
