//! Router assembly and the request-wrapping error pipeline

use crate::core::error::ServiceError;
use crate::members;
use crate::server::host::ServiceHost;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Build the complete application router
///
/// - `GET /health`, always at the root
/// - member routes, nested under `server.base_path` when one is configured
///
/// Every route goes through [`with_error_pipeline`].
pub fn build_router(host: Arc<ServiceHost>) -> Router {
    let base_path = normalize_base_path(&host.config().server.base_path);
    let member_routes = members::routes(host);

    let app = match base_path {
        Some(base) => Router::new().nest(&base, member_routes),
        None => member_routes,
    };

    with_error_pipeline(app.route("/health", get(health_check)))
}

/// Wrap `router` so that every failure leaves as the standard error response
///
/// Handlers return `HandlerResult<T>`, whose errors are translated by
/// `ServiceError`'s `IntoResponse`. A panicking handler is caught and
/// answered with the same `500` body. Requests are traced.
pub fn with_error_pipeline<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "request handler panicked");
    ServiceError::Internal("the request handler failed unexpectedly".to_string()).into_response()
}

/// `"/v5/"` → `Some("/v5")`; empty and `"/"` → `None`
fn normalize_base_path(base_path: &str) -> Option<String> {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "member-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
