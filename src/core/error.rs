use axum::BoxError;
use axum::http::StatusCode;
use axum::http::header::ToStrError;
use axum::response::{IntoResponse, Response};

use crate::codec::CodecError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Session error: {0}")]
    Session(#[from] Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No request context")]
    NoContext,
    #[error("Invalid token format: {0}")]
    InvalidToken(#[from] CodecError),
    #[error("Invalid key segment: {0:?}")]
    InvalidSegment(String),
    #[error("Token already belongs to another id")]
    TokenConflict,
    #[error("Machine id {0} out of range")]
    InvalidMachineId(u16),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("No credentials provided")]
    NoCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Header decode error: {0}")]
    HeaderDecode(#[from] ToStrError),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!("{:?}", self);

        let (status, message) = match self {
            Error::NoContext => (StatusCode::INTERNAL_SERVER_ERROR, "No request context"),
            Error::InvalidToken(_) => (StatusCode::BAD_REQUEST, "Invalid token format"),
            Error::InvalidSegment(_) => (StatusCode::BAD_REQUEST, "Invalid key segment"),
            Error::TokenConflict => (StatusCode::CONFLICT, "Token already in use"),
            Error::InvalidMachineId(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Invalid machine id")
            }
            Error::Store(StoreError::InvalidExpire(_)) => {
                (StatusCode::BAD_REQUEST, "Invalid expire time")
            }
            Error::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Store error"),
            Error::NoCredentials => (StatusCode::UNAUTHORIZED, "No credentials provided"),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Error::HeaderDecode(_) => (StatusCode::BAD_REQUEST, "Header decode error"),
            Error::Base64(_) => (StatusCode::UNAUTHORIZED, "Invalid credentials encoding"),
        };

        (status, message).into_response()
    }
}

pub(crate) async fn handle_middleware_errors(err: BoxError) -> (StatusCode, &'static str) {
    tracing::error!("Unhandled error: {:?}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}
