use super::Phase;
use mosaic_event_bus::EventBus;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// A lifecycle transition of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Started { phase: Phase },
    Completed { phase: Phase, elapsed: Duration },
}

impl PhaseEvent {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Started { phase } | Self::Completed { phase, .. } => *phase,
        }
    }

    /// Event name such as `DB_CONNECTION_STARTED`.
    #[must_use]
    pub fn name(&self) -> String {
        let suffix = match self {
            Self::Started { .. } => "STARTED",
            Self::Completed { .. } => "COMPLETED",
        };
        format!("{}_{suffix}", self.phase().event_prefix())
    }
}

impl fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Receives every phase transition. Observers cannot fail the bootstrap.
pub trait PhaseObserver: Send + Sync {
    fn on_event(&self, event: &PhaseEvent);
}

/// Logs transitions through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PhaseObserver for TracingObserver {
    fn on_event(&self, event: &PhaseEvent) {
        match event {
            PhaseEvent::Started { phase } => debug!(phase = %phase, event = %event, "Phase started"),
            PhaseEvent::Completed { phase, elapsed } => info!(
                phase = %phase,
                event = %event,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "Phase completed"
            ),
        }
    }
}

/// Republishes transitions as [`PhaseEvent`]s on an [`EventBus`].
#[derive(Debug, Clone)]
pub struct EventBusObserver {
    bus: EventBus,
}

impl EventBusObserver {
    #[must_use]
    pub const fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl PhaseObserver for EventBusObserver {
    fn on_event(&self, event: &PhaseEvent) {
        if let Err(err) = self.bus.publish(*event) {
            debug!(event = %event, error = %err, "Lifecycle event not published");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_event_bus::EventReceiverExt;

    #[test]
    fn event_names_follow_the_phase() {
        let started = PhaseEvent::Started { phase: Phase::ModuleResolution };
        let completed = PhaseEvent::Completed { phase: Phase::DbConnection, elapsed: Duration::ZERO };
        assert_eq!(started.name(), "MODULE_RESOLUTION_STARTED");
        assert_eq!(completed.to_string(), "DB_CONNECTION_COMPLETED");
    }

    #[tokio::test]
    async fn bus_observer_republishes() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe::<PhaseEvent>().unwrap();

        EventBusObserver::new(bus).on_event(&PhaseEvent::Started { phase: Phase::Config });

        let event = rx.recv_event().await.unwrap();
        assert_eq!(event.phase(), Phase::Config);
    }
}
