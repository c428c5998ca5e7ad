use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// Lifecycle of the call session.
///
/// Exactly one value is live at any time, owned by the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    EngineReady,
    Joining,
    Joined,
    Leaving,
}

impl SessionState {
    /// True once a join has been confirmed by the engine.
    pub fn is_joined(&self) -> bool {
        matches!(self, SessionState::Joined)
    }
}

/// Events emitted by the core to the rendering shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HuddleEvent {
    StateChanged(SessionState),
    PeerJoined(u32),
    PeerLeft(u32),
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from tokio tasks).
pub trait HuddleEventListener: Send + Sync {
    fn on_event(&self, event: HuddleEvent);
}

/// Handle returned at subscription time; removes its listener when dropped.
///
/// Removal is synchronous: once the guard is dropped, the listener will not
/// be handed another event.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

/// Internal event emitter that dispatches to registered listeners.
#[derive(Clone)]
pub struct EventEmitter {
    listeners: Arc<RwLock<Vec<(u64, Arc<dyn HuddleEventListener>)>>>,
    next_id: Arc<AtomicU64>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn HuddleEventListener>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().unwrap().push((id, listener));

        let listeners: Weak<RwLock<Vec<(u64, Arc<dyn HuddleEventListener>)>>> =
            Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.write().unwrap().retain(|(lid, _)| *lid != id);
            }
        })
    }

    pub fn emit(&self, event: HuddleEvent) {
        // Snapshot so a listener dropping its own subscription mid-dispatch
        // cannot deadlock against the registry lock.
        let listeners = self.listeners.read().unwrap().clone();
        for (_, listener) in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}
