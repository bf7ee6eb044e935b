use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::store::KvStore;
use crate::types::{request, response};

#[instrument(skip_all)]
pub(crate) async fn login<S: KvStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(params): Json<request::LoginData>,
) -> Result<impl IntoResponse, Error> {
    let tinytoken = &state.tinytoken;

    if !tinytoken.is_correct_header(&headers)? {
        return Err(Error::Unauthorized);
    }

    let timeout = params.timeout.unwrap_or(tinytoken.settings().timeout);
    let token = tinytoken
        .issue_token(&params.id, params.extra.as_deref(), timeout)
        .await?;

    Ok((StatusCode::CREATED, Json(response::Login::new(token))))
}
