//! HTTP surface for Bookshelf.
//!
//! # Responsibility
//! - Bind routes to handlers and attach request logging.
//! - Serve the static directory (covers and collage) under `/static`.
//! - Keep all catalogue access behind the injected `AppState`.

pub mod config;
pub mod covers;
pub mod error;
pub mod handlers;
pub mod views;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use log::{info, warn};
use std::time::Instant;
use tower_http::services::ServeDir;

pub use config::ServerConfig;
pub use covers::CoverStore;
pub use error::AppError;
pub use handlers::AppState;

/// Builds the application router around an already-opened catalogue.
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(state.covers.static_dir());
    Router::new()
        .route("/", get(handlers::intro))
        .route("/home", get(handlers::home))
        .route("/add", get(handlers::add_form).post(handlers::add_submit))
        .route("/collection", get(handlers::collection))
        .route(
            "/book/:id/edit",
            get(handlers::edit_form).post(handlers::edit_submit),
        )
        .route("/book/:id/delete", post(handlers::delete))
        .nest_service(covers::STATIC_URL, static_files)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(covers::MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let started_at = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = started_at.elapsed().as_millis();
    if status.is_server_error() {
        warn!(
            "event=http_request module=server status=error method={method} path={path} http_status={} duration_ms={duration_ms}",
            status.as_u16()
        );
    } else {
        info!(
            "event=http_request module=server status=ok method={method} path={path} http_status={} duration_ms={duration_ms}",
            status.as_u16()
        );
    }
    response
}
