use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::errors::HuddleError;
use crate::events::Subscription;

/// Opaque reference to an initialized media engine.
///
/// Created once by a successful [`EngineGateway::initialize`] and held for
/// the session lifetime; never recreated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineHandle(u64);

impl EngineHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Lifecycle events emitted by the media engine.
///
/// Delivery is at-least-once and unordered relative to command completions.
/// Consumers must absorb duplicates and stragglers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Ready,
    JoinChannelSuccess {
        channel: String,
        uid: u32,
        elapsed_ms: u64,
    },
    UserJoined {
        uid: u32,
        elapsed_ms: u64,
    },
    UserOffline {
        uid: u32,
        reason: u32,
    },
}

/// Trait for receiving events from an engine gateway.
/// Implementations must be Send + Sync (called from engine threads/tasks).
pub trait EngineEventListener: Send + Sync {
    fn on_event(&self, event: EngineEvent);
}

/// The media-engine capability consumed by the session controller.
///
/// `join_channel` and `leave_channel` are fire-and-forget: the returned
/// future resolving means the command was accepted, not that channel state
/// changed — the outcome arrives later as an [`EngineEvent`].
pub trait EngineGateway: Send + Sync {
    /// Create the engine. Called exactly once per session lifetime.
    fn initialize(
        &self,
        app_id: &str,
    ) -> impl Future<Output = Result<EngineHandle, HuddleError>> + Send;

    /// Enable local video capture and rendering. Idempotent.
    fn enable_video(
        &self,
        handle: &EngineHandle,
    ) -> impl Future<Output = Result<(), HuddleError>> + Send;

    fn join_channel(
        &self,
        handle: &EngineHandle,
        token: &str,
        channel: &str,
        optional_info: Option<&str>,
        local_uid: u32,
    ) -> impl Future<Output = Result<(), HuddleError>> + Send;

    fn leave_channel(
        &self,
        handle: &EngineHandle,
    ) -> impl Future<Output = Result<(), HuddleError>> + Send;

    /// Register a listener for engine events. Dropping the returned
    /// [`Subscription`] removes the listener synchronously.
    fn subscribe(&self, listener: Arc<dyn EngineEventListener>) -> Subscription;
}

/// Listener registry for gateway implementations.
///
/// Dispatches in registration order; removal via the [`Subscription`] guard
/// completes before its drop returns, so a torn-down listener never sees a
/// later event.
#[derive(Clone)]
pub struct EngineEventHub {
    listeners: Arc<RwLock<Vec<(u64, Arc<dyn EngineEventListener>)>>>,
    next_id: Arc<AtomicU64>,
}

impl EngineEventHub {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn EngineEventListener>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().unwrap().push((id, listener));

        let listeners: Weak<RwLock<Vec<(u64, Arc<dyn EngineEventListener>)>>> =
            Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.write().unwrap().retain(|(lid, _)| *lid != id);
            }
        })
    }

    pub fn emit(&self, event: EngineEvent) {
        let listeners = self.listeners.read().unwrap().clone();
        for (_, listener) in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Capture {
        events: Arc<Mutex<Vec<EngineEvent>>>,
    }

    impl EngineEventListener for Capture {
        fn on_event(&self, event: EngineEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn hub_delivers_events() {
        let hub = EngineEventHub::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let _sub = hub.subscribe(Arc::new(Capture {
            events: events.clone(),
        }));

        hub.emit(EngineEvent::UserJoined {
            uid: 7,
            elapsed_ms: 5,
        });

        let captured = events.lock().unwrap();
        assert_eq!(
            captured.as_slice(),
            &[EngineEvent::UserJoined {
                uid: 7,
                elapsed_ms: 5
            }]
        );
    }

    #[test]
    fn dropped_subscription_removes_listener() {
        let hub = EngineEventHub::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        let sub = hub.subscribe(Arc::new(Capture {
            events: events.clone(),
        }));
        hub.emit(EngineEvent::Ready);
        drop(sub);
        hub.emit(EngineEvent::Ready);

        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn events_arrive_in_emit_order() {
        let hub = EngineEventHub::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let _sub = hub.subscribe(Arc::new(Capture {
            events: events.clone(),
        }));

        hub.emit(EngineEvent::Ready);
        hub.emit(EngineEvent::UserOffline { uid: 3, reason: 1 });

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0], EngineEvent::Ready);
        assert_eq!(captured[1], EngineEvent::UserOffline { uid: 3, reason: 1 });
    }
}
