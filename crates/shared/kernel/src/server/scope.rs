use crate::container::Container;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use mosaic_database::Database;
use mosaic_domain::constants::keys;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

/// Header carrying the request id, echoed back on the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

/// Per-request facts bound as `requestContext` in the request scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Caller address; absent when the server runs without connect info.
    pub remote_addr: Option<SocketAddr>,
    pub request_id: String,
}

/// Middleware creating the request scope.
///
/// Binds `requestContext` and, when a connection exists, `manager` into a fresh child of
/// `root`. The process registry itself is never written.
pub async fn request_scope(State(root): State<Container>, mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or_else(
            || format!("req-{}", NEXT_REQUEST.fetch_add(1, Ordering::Relaxed)),
            str::to_owned,
        );
    let remote_addr =
        request.extensions().get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| *addr);

    let scope = root.create_scope();
    scope.register_value(
        keys::REQUEST_CONTEXT,
        RequestContext { remote_addr, request_id: request_id.clone() },
    );
    match root.try_resolve::<Database>(keys::PG_CONNECTION) {
        Ok(Some(connection)) => {
            scope.register_arc(keys::MANAGER, connection);
        },
        Ok(None) => {},
        Err(err) => warn!(error = %err, "Connection binding unusable, manager not bound"),
    }
    trace!(request_id = %request_id, remote = ?remote_addr, "Request scope created");

    request.extensions_mut().insert(scope);
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
