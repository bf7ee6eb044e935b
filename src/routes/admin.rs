use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::store::KvStore;
use crate::types::response;

#[instrument(skip(state))]
pub(crate) async fn tokens_by_id<S: KvStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, Error> {
    let infos = state.tinytoken.get_info_extra_by_id(&id).await?;

    Ok(Json(infos))
}

#[instrument(skip(state))]
pub(crate) async fn delete_by_id<S: KvStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, Error> {
    let deleted = state.tinytoken.delete_by_id(&id).await?;

    Ok(Json(response::Deleted { deleted }))
}

#[instrument(skip_all)]
pub(crate) async fn tokens<S: KvStore>(
    State(state): State<AppState<S>>,
) -> Result<impl IntoResponse, Error> {
    Ok(Json(state.tinytoken.get_info().await?))
}

#[instrument(skip_all)]
pub(crate) async fn persistent_tokens<S: KvStore>(
    State(state): State<AppState<S>>,
) -> Result<impl IntoResponse, Error> {
    Ok(Json(state.tinytoken.get_info_persist().await?))
}
