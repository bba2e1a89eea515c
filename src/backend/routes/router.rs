/**
 * Router Configuration
 *
 * Assembles the full `/v1` surface:
 *
 * - `/v1/auth/login` - credential exchange, no auth required
 * - `/v1/api/...`    - file CRUD, journal, snapshots, export; bearer auth
 * - `/v1/sync`       - streaming upgrade; token in the `jwt` query param
 *
 * CORS allows any origin, the API's methods, and the Authorization
 * header: editor plugins connect from app-local origins.
 */

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, Method};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

/// Deadline for any plain HTTP request; the streaming upgrade is exempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

use crate::backend::api::export::export_workspace;
use crate::backend::api::files::{create_file, delete_file, fetch_file, list_files, update_file};
use crate::backend::api::operations::list_operations;
use crate::backend::api::snapshots::{fetch_snapshot, list_snapshots};
use crate::backend::api::ws::sync_handler;
use crate::backend::auth::handlers::login;
use crate::backend::middleware::auth_middleware;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/file", get(list_files).post(create_file))
        .route(
            "/file/{id}",
            get(fetch_file).patch(update_file).delete(delete_file),
        )
        .route("/file/{id}/snapshot", get(list_snapshots))
        .route("/file/{id}/snapshot/{version}", get(fetch_snapshot))
        .route("/operation", get(list_operations))
        .route("/export", get(export_workspace))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.options.max_file_size as usize))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    let auth_routes = Router::new()
        .route("/login", post(login))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::HEAD,
            Method::GET,
            Method::POST,
            Method::OPTIONS,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            CONTENT_TYPE,
            ACCEPT,
            AUTHORIZATION,
        ]);

    Router::new()
        .nest("/v1/api", api_routes)
        .nest("/v1/auth", auth_routes)
        .route("/v1/sync", get(sync_handler))
        .layer(cors)
        .with_state(state)
}
