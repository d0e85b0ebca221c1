use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Buffer per event type; lifecycle traffic is a few dozen events per boot.
const DEFAULT_CAPACITY: usize = 128;

/// Marker trait for types that can be sent across the [`EventBus`].
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

type Channels = FxHashMap<TypeId, Box<dyn Any + Send + Sync>>;

/// Cloneable handle to a shared set of typed broadcast channels.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    channels: Arc<RwLock<Channels>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to events of type `T`.
    ///
    /// # Errors
    /// Returns [`EventBusError::TypeMismatch`] if the channel for `T` is corrupted.
    pub fn subscribe<T: Event>(&self) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        self.subscribe_with_capacity::<T>(DEFAULT_CAPACITY)
    }

    /// Subscribes with an explicit buffer size. The capacity only applies when this call
    /// creates the channel.
    ///
    /// # Errors
    /// Returns [`EventBusError::InvalidCapacity`] if `capacity` is zero.
    pub fn subscribe_with_capacity<T: Event>(
        &self,
        capacity: usize,
    ) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        if capacity == 0 {
            return Err(EventBusError::InvalidCapacity {
                message: "capacity must be >= 1".into(),
                context: Some(std::any::type_name::<T>().into()),
            });
        }
        Ok(self.sender::<T>(capacity)?.subscribe())
    }

    /// Publishes `event` to every current subscriber and returns how many received it.
    ///
    /// Publishing without subscribers is not an error; the event is dropped.
    ///
    /// # Errors
    /// Returns [`EventBusError::TypeMismatch`] if the channel for `T` is corrupted.
    pub fn publish<T: Event>(&self, event: T) -> Result<usize, EventBusError> {
        self.publish_arc(Arc::new(event))
    }

    /// Publishes an already shared event without re-wrapping it.
    ///
    /// # Errors
    /// Returns [`EventBusError::TypeMismatch`] if the channel for `T` is corrupted.
    pub fn publish_arc<T: Event>(&self, event: Arc<T>) -> Result<usize, EventBusError> {
        let sender = self.sender::<T>(DEFAULT_CAPACITY)?;
        let delivered = sender.send(event).unwrap_or(0);
        trace!(event = std::any::type_name::<T>(), delivered, "Event dispatched");
        Ok(delivered)
    }

    /// Number of live subscribers for `T`.
    #[must_use]
    pub fn receiver_count<T: Event>(&self) -> usize {
        self.channels
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|state| state.downcast_ref::<broadcast::Sender<Arc<T>>>())
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drops every channel so subscribers observe closure. Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        let mut channels = self.channels.write();
        let closed = channels.len();
        channels.clear();
        closed
    }

    fn sender<T: Event>(&self, capacity: usize) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        let key = TypeId::of::<T>();

        if let Some(state) = self.channels.read().get(&key) {
            return downcast::<T>(state.as_ref());
        }

        let mut channels = self.channels.write();
        let state = channels.entry(key).or_insert_with(|| {
            let (tx, _) = broadcast::channel::<Arc<T>>(capacity);
            Box::new(tx)
        });
        downcast::<T>(state.as_ref())
    }
}

fn downcast<T: Event>(state: &(dyn Any + Send + Sync)) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
    state.downcast_ref::<broadcast::Sender<Arc<T>>>().cloned().ok_or_else(|| {
        EventBusError::TypeMismatch {
            message: std::any::type_name::<T>().into(),
            context: Some("Unexpected sender type".into()),
        }
    })
}
