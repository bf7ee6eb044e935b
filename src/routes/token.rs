use axum::Json;
use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::session::TokenInfo;
use crate::store::KvStore;
use crate::types::{request, response};

pub(crate) async fn get(Extension(info): Extension<TokenInfo<u64>>) -> impl IntoResponse {
    Json(info)
}

#[instrument(skip_all)]
pub(crate) async fn delete<S: KvStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, Error> {
    let updated = state.tinytoken.delete_current(&headers).await?;

    Ok(Json(response::Updated { updated }))
}

#[instrument(skip_all)]
pub(crate) async fn expire<S: KvStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(params): Json<request::ExpireData>,
) -> Result<impl IntoResponse, Error> {
    let updated = state
        .tinytoken
        .expire_current(&headers, params.timeout)
        .await?;

    Ok(Json(response::Updated { updated }))
}

#[instrument(skip_all)]
pub(crate) async fn persist<S: KvStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, Error> {
    let updated = state.tinytoken.persist_current(&headers).await?;

    Ok(Json(response::Updated { updated }))
}

#[instrument(skip_all)]
pub(crate) async fn set_extra<S: KvStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(params): Json<request::ExtraData>,
) -> Result<impl IntoResponse, Error> {
    let updated = state
        .tinytoken
        .set_extra_current(&headers, &params.extra)
        .await?;

    Ok(Json(response::Updated { updated }))
}
