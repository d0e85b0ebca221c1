use axum::Router;
use axum::http::StatusCode;
use mosaic::kernel::container::Container;
use mosaic::server::platform_router;

/// Registry key of the assembled HTTP router.
pub(crate) const ROUTER_KEY: &str = "httpRouter";

#[allow(unreachable_pub)]
pub fn init(root: Container) -> Router {
    platform_router(root).fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
}
