//! Event System
//!
//! Device lifecycle events and the async emitter the allocation driver
//! notifies. Listeners are awaited in registration order and the first
//! failure is returned to the emitter's caller; passive subscribers receive
//! a copy of every successfully delivered event.

use std::sync::Arc;

use async_trait::async_trait;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::debug;

/// Device lifecycle events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A device was allocated and is about to be used
    BootDevice {
        device_id: String,
        device_type: String,
        cold_boot: bool,
    },
    /// A device is about to be shut down
    BeforeShutdownDevice { device_id: String },
    /// A device was shut down
    ShutdownDevice { device_id: String },
}

impl DeviceEvent {
    /// Event name as seen by listeners
    pub fn name(&self) -> &'static str {
        match self {
            DeviceEvent::BootDevice { .. } => "bootDevice",
            DeviceEvent::BeforeShutdownDevice { .. } => "beforeShutdownDevice",
            DeviceEvent::ShutdownDevice { .. } => "shutdownDevice",
        }
    }

    /// Event payload as a JSON object
    pub fn payload(&self) -> Value {
        match self {
            DeviceEvent::BootDevice { device_id, device_type, cold_boot } => json!({
                "deviceId": device_id,
                "type": device_type,
                "coldBoot": cold_boot,
            }),
            DeviceEvent::BeforeShutdownDevice { device_id }
            | DeviceEvent::ShutdownDevice { device_id } => json!({ "deviceId": device_id }),
        }
    }
}

/// Event delivery errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("Listener failed on {event}: {reason}")]
    ListenerFailed { event: String, reason: String },
}

impl EventError {
    pub fn listener_failed(event: &DeviceEvent, reason: impl Into<String>) -> Self {
        EventError::ListenerFailed {
            event: event.name().to_string(),
            reason: reason.into(),
        }
    }
}

/// Publisher side of the event channel
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Deliver an event, failing if any listener fails
    async fn emit(&self, event: &DeviceEvent) -> Result<(), EventError>;
}

/// An awaited event handler
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: &DeviceEvent) -> Result<(), EventError>;
}

/// Subscriber handle for receiving events
#[derive(Clone)]
pub struct EventSubscription {
    receiver: Receiver<DeviceEvent>,
}

impl EventSubscription {
    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Result<DeviceEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain everything received so far
    pub fn drain(&self) -> Vec<DeviceEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Event bus for publish/subscribe pattern
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    subscribers: RwLock<Vec<Sender<DeviceEvent>>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register an awaited listener
    pub fn on(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().push(listener);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = unbounded();
        self.subscribers.write().push(sender);
        EventSubscription { receiver }
    }

    /// Get the number of registered listeners and subscribers
    pub fn subscriber_count(&self) -> usize {
        self.listeners.read().len() + self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventEmitter for EventBus {
    async fn emit(&self, event: &DeviceEvent) -> Result<(), EventError> {
        // Snapshot so no lock is held across an await
        let listeners: Vec<_> = self.listeners.read().iter().cloned().collect();
        for listener in listeners {
            listener.on_event(event).await?;
        }

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());

        debug!("Event {} delivered with payload {}", event.name(), event.payload());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventListener for Recorder {
        async fn on_event(&self, event: &DeviceEvent) -> Result<(), EventError> {
            self.seen.lock().push(event.name().to_string());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventListener for Failing {
        async fn on_event(&self, event: &DeviceEvent) -> Result<(), EventError> {
            Err(EventError::listener_failed(event, "artifacts disk full"))
        }
    }

    fn boot() -> DeviceEvent {
        DeviceEvent::BootDevice {
            device_id: "emulator-5554".to_string(),
            device_type: "Pixel_4".to_string(),
            cold_boot: true,
        }
    }

    #[test]
    fn test_boot_payload_shape() {
        assert_eq!(boot().name(), "bootDevice");
        assert_eq!(
            boot().payload(),
            json!({ "deviceId": "emulator-5554", "type": "Pixel_4", "coldBoot": true })
        );
    }

    #[tokio::test]
    async fn test_event_bus() {
        let bus = EventBus::new();
        let recorder = Arc::new(Recorder { seen: Mutex::new(Vec::new()) });
        bus.on(recorder.clone());
        let sub = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(&boot()).await.unwrap();
        bus.emit(&DeviceEvent::ShutdownDevice { device_id: "emulator-5554".into() })
            .await
            .unwrap();

        assert_eq!(*recorder.seen.lock(), vec!["bootDevice", "shutdownDevice"]);
        assert_eq!(sub.drain().len(), 2);
    }

    #[tokio::test]
    async fn test_listener_failure_propagates() {
        let bus = EventBus::new();
        bus.on(Arc::new(Failing));
        let sub = bus.subscribe();

        let err = bus.emit(&boot()).await.unwrap_err();
        assert_eq!(err, EventError::listener_failed(&boot(), "artifacts disk full"));
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        drop(bus.subscribe());
        let kept = bus.subscribe();

        bus.emit(&boot()).await.unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.drain(), vec![boot()]);
    }
}
