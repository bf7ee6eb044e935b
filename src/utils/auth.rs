use axum::extract::State;
use axum::{body::Body, extract::Request, http::Response, middleware::Next};

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::store::KvStore;

/// Resolves the token header to a live session and stores its info on the request.
pub(crate) async fn authorize<S: KvStore>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Result<Response<Body>, Error> {
    let token = state
        .tinytoken
        .get_token(request.headers())?
        .ok_or(Error::NoCredentials)?;

    let info = state
        .tinytoken
        .get_info_extra_by_token(&token)
        .await?
        .ok_or(Error::Unauthorized)?;

    tracing::debug!(id = ?info.id, "request authorized");

    request.extensions_mut().insert(info);

    Ok(next.run(request).await)
}

/// Lets through requests carrying the configured basic-auth credentials.
pub(crate) async fn authenticate_admin<S: KvStore>(
    State(state): State<AppState<S>>,
    request: Request,
    next: Next,
) -> Result<Response<Body>, Error> {
    if !state.tinytoken.is_correct_header(request.headers())? {
        return Err(Error::Unauthorized);
    }

    Ok(next.run(request).await)
}
