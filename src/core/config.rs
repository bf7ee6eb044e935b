use serde::Deserialize;

use crate::codec::TokenKind;
use crate::session::{Credentials, Settings};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub(crate) enum StoreKind {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct Args {
    #[serde(default = "default_prefix")]
    pub(crate) prefix: String,
    #[serde(default = "default_header")]
    pub(crate) header: String,
    #[serde(default = "default_timeout")]
    pub(crate) timeout: i64,
    #[serde(default)]
    pub(crate) token_kind: TokenKind,
    #[serde(default)]
    pub(crate) machine_id: u16,
    #[serde(default)]
    pub(crate) strict_extra_update: bool,
    pub(crate) auth_username: Option<String>,
    pub(crate) auth_password: Option<String>,
    #[serde(default)]
    pub(crate) store: StoreKind,
    #[serde(default = "default_redis_url")]
    pub(crate) redis_url: String,
    #[serde(default = "default_port")]
    pub(crate) port: u16,
    #[serde(default = "default_log_level")]
    pub(crate) log_level: String,
}

fn default_prefix() -> String {
    "tinytoken".into()
}

fn default_header() -> String {
    "Authorization".into()
}

fn default_timeout() -> i64 {
    2_592_000
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".into()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".into()
}

impl Args {
    pub(crate) fn settings(&self) -> Settings {
        let credentials = match (&self.auth_username, &self.auth_password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        Settings {
            prefix: self.prefix.clone(),
            header: self.header.clone(),
            timeout: self.timeout,
            token_kind: self.token_kind,
            machine_id: self.machine_id,
            strict_extra_update: self.strict_extra_update,
            credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    #[test]
    fn test_defaults() {
        let args: Args = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(args.prefix, "tinytoken");
        assert_eq!(args.header, "Authorization");
        assert_eq!(args.timeout, 2_592_000);
        assert_eq!(args.store, StoreKind::Redis);
        assert!(args.settings().credentials.is_none());
    }

    #[test]
    fn test_overrides() {
        let source = r#"
            prefix = "app"
            header = "tinytoken"
            timeout = 100
            token_kind = "identity"
            store = "memory"
            auth_username = "admin"
            auth_password = "secret"
        "#;
        let args: Args = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let settings = args.settings();
        assert_eq!(settings.prefix, "app");
        assert_eq!(settings.timeout, 100);
        assert_eq!(settings.token_kind, TokenKind::Identity);
        assert_eq!(args.store, StoreKind::Memory);
        assert_eq!(
            settings.credentials,
            Some(Credentials {
                username: "admin".into(),
                password: "secret".into()
            })
        );
    }
}
