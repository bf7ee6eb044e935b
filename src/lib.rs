//! Opaque session tokens stored in a shared key-value store.
//!
//! [`session::TinyToken`] issues tokens for an application id, resolves them back
//! and manages their lifetime. Tokens come from [`codec::token`], a salted base-62
//! encoding of a time-ordered 64-bit serial; session records live in any
//! [`store::KvStore`], normally Redis.

pub mod codec;
pub mod core;
pub(crate) mod routes;
pub mod session;
pub mod store;
pub(crate) mod types;
pub mod utils;

use config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::core::config::{Args, StoreKind};
use crate::core::error::ConfigError as Error;
use crate::core::state::AppState;
use crate::session::TinyToken;
use crate::store::{KvStore, MemoryStore, RedisStore};

pub use crate::core::error::Error as SessionError;
pub use crate::session::{RequestHeaders, SessionId, Settings, TokenInfo};

pub async fn run() -> Result<(), Error> {
    let config = Config::builder()
        .add_source(config::Environment::with_prefix("TINYTOKEN"))
        .build()
        .map_err(Error::Config)?;

    let config = config.try_deserialize::<Args>().map_err(Error::Config)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&config.log_level).unwrap_or_default())
        .with(tracing_subscriber::fmt::layer())
        .init();

    match config.store {
        StoreKind::Redis => {
            let store = RedisStore::connect(&config.redis_url).await?;
            serve(store, &config).await
        }
        StoreKind::Memory => {
            tracing::warn!("using the in-process store, sessions are lost on restart");
            serve(MemoryStore::new(), &config).await
        }
    }
}

async fn serve<S: KvStore>(store: S, config: &Args) -> Result<(), Error> {
    let tinytoken = TinyToken::new(store, config.settings())?;
    let app = routes::router::routes(AppState::new(tinytoken));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(Error::IO)?;

    tracing::debug!("listening on port {}", config.port);

    axum::serve(listener, app).await.map_err(Error::IO)?;

    Ok(())
}
