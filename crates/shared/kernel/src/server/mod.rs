//! HTTP surface over a started platform.
//!
//! Every request gets its own child scope of the process registry, created by
//! [`request_scope`] and handed to handlers as an `Extension<Container>`.

mod health;
mod query;
mod router;
mod scope;

pub use query::QueryRejection;
pub use router::platform_router;
pub use scope::{REQUEST_ID_HEADER, RequestContext, request_scope};
