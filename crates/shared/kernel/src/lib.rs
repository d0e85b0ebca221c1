//! Platform kernel.
//!
//! Everything that turns a deployment config into a running platform lives here: the
//! hierarchical [`container::Container`], the phase sequencer in [`bootstrap`], feature flags,
//! module merge/resolution and the federated [`federation::RemoteQuery`].
//!
//! ```rust,ignore
//! let platform = Bootstrapper::new(config)
//!     .modules(modules)
//!     .joiner(joiner)
//!     .observer(TracingObserver)
//!     .run()
//!     .await?;
//!
//! let remote_query = platform.remote_query()?;
//! ```

pub mod bootstrap;
pub mod config;
pub mod container;
mod error;
pub mod federation;
pub mod flags;
pub mod modules;
#[cfg(feature = "server")]
pub mod server;

pub use error::{KernelError, KernelErrorExt};
pub use mosaic_domain as domain;

use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future used at the trait-object seams (hooks, loaders, module fetches).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
