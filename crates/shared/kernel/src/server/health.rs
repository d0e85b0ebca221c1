use crate::container::Container;
use crate::flags::RuntimeMode;
use crate::modules::ActiveModules;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use mosaic_domain::constants::keys;
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Instant;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime: u64,
    mode: String,
    modules: Vec<String>,
}

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

pub(super) async fn health_handler(Extension(scope): Extension<Container>) -> impl IntoResponse {
    let mode = scope
        .resolve::<RuntimeMode>(keys::RUNTIME_MODE)
        .map(|mode| mode.to_string())
        .unwrap_or_else(|_| "unknown".to_owned());
    let modules = scope
        .resolve::<ActiveModules>(keys::MODULES)
        .map(|active| active.names().map(str::to_owned).collect())
        .unwrap_or_default();

    let body = HealthResponse {
        status: "up",
        version: env!("CARGO_PKG_VERSION"),
        uptime: START_TIME.elapsed().as_secs(),
        mode,
        modules,
    };

    (
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(body),
    )
}
