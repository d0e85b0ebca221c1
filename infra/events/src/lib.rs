//! # Event Bus
//!
//! A typed fan-out bus. Every event type gets its own `tokio` broadcast channel, created on
//! first use and looked up by [`TypeId`](std::any::TypeId) afterwards.
//!
//! The kernel publishes phase lifecycle events here; anything interested (metrics bridges,
//! readiness probes, tests) subscribes without the sequencer knowing about it.
//!
//! # Example
//!
//! ```rust
//! use mosaic_event_bus::{EventBus, EventBusError, EventReceiverExt};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct ModuleReady { name: &'static str }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!
//!     let mut rx = bus.subscribe::<ModuleReady>()?;
//!     bus.publish(ModuleReady { name: "order" })?;
//!
//!     let event = rx.recv_event().await.unwrap();
//!     assert_eq!(event.name, "order");
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{Event, EventBus};
pub use error::{EventBusError, EventBusErrorExt};
pub use receiver::EventReceiverExt;
