use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::{
    Router,
    extract::{MatchedPath, Request},
    http::Method,
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing::info_span;

use crate::core::error;
use crate::core::state::AppState;
use crate::routes::{admin, auth, token};
use crate::store::KvStore;
use crate::utils;

pub(crate) fn routes<S: KvStore>(state: AppState<S>) -> Router {
    // /token/...
    let token_router = Router::new()
        .route("/", get(token::get).delete(token::delete::<S>))
        .route("/expire", post(token::expire::<S>))
        .route("/persist", post(token::persist::<S>))
        .route("/extra", put(token::set_extra::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            utils::auth::authorize::<S>,
        ));

    // /admin/...
    let admin_router = Router::new()
        .route("/tokens", get(admin::tokens::<S>))
        .route("/tokens/persist", get(admin::persistent_tokens::<S>))
        .route(
            "/ids/{id}",
            get(admin::tokens_by_id::<S>).delete(admin::delete_by_id::<S>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            utils::auth::authenticate_admin::<S>,
        ));

    Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route("/login", post(auth::login::<S>))
        .nest("/token", token_router)
        .nest("/admin", admin_router)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                        let matched_path = request
                            .extensions()
                            .get::<MatchedPath>()
                            .map(MatchedPath::as_str);

                        info_span!(
                            "request",
                            method = ?request.method(),
                            matched_path,
                        )
                    }),
                )
                .layer(HandleErrorLayer::new(error::handle_middleware_errors))
                .buffer(128)
                .rate_limit(100, Duration::from_secs(1))
                .layer(
                    CorsLayer::new()
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                        ])
                        .allow_origin(cors::Any),
                ),
        )
}
