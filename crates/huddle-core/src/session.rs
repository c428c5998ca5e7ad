use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::config::CallConfig;
use crate::errors::HuddleError;
use crate::events::{EventEmitter, HuddleEvent, HuddleEventListener, SessionState, Subscription};
use crate::gateway::{EngineEvent, EngineEventListener, EngineGateway, EngineHandle};
use crate::peers::PeerRoster;

/// Forwards engine events into the session's event-loop channel.
struct EventForwarder {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventListener for EventForwarder {
    fn on_event(&self, event: EngineEvent) {
        // A closed receiver means the session is shutting down.
        let _ = self.tx.send(event);
    }
}

/// Owns the call-session state machine and coordinates the engine gateway
/// with the peer roster.
///
/// All transitions are published as [`HuddleEvent`]s; the rendering shell
/// reads [`CallSession::state`] and [`CallSession::peers`] and never mutates
/// either.
pub struct CallSession<E: EngineGateway> {
    engine: Arc<E>,
    config: CallConfig,
    handle: Mutex<Option<EngineHandle>>,
    state: Arc<Mutex<SessionState>>,
    roster: Arc<Mutex<PeerRoster>>,
    expected_channel: Arc<Mutex<Option<String>>>,
    emitter: EventEmitter,
    subscription: std::sync::Mutex<Option<Subscription>>,
    event_task: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<E: EngineGateway + 'static> CallSession<E> {
    pub fn new(engine: Arc<E>, config: CallConfig) -> Self {
        Self {
            engine,
            config,
            handle: Mutex::new(None),
            state: Arc::new(Mutex::new(SessionState::Uninitialized)),
            roster: Arc::new(Mutex::new(PeerRoster::new())),
            expected_channel: Arc::new(Mutex::new(None)),
            emitter: EventEmitter::new(),
            subscription: std::sync::Mutex::new(None),
            event_task: std::sync::Mutex::new(None),
        }
    }

    /// Register a listener for session events.
    pub fn add_listener(&self, listener: Arc<dyn HuddleEventListener>) -> Subscription {
        self.emitter.add_listener(listener)
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// True once a join has been confirmed by the engine. Gates rendering of
    /// the local/remote video surfaces.
    pub async fn is_joined(&self) -> bool {
        self.state.lock().await.is_joined()
    }

    /// Snapshot of currently-present remote peer uids, in join order.
    pub async fn peers(&self) -> Vec<u32> {
        self.roster.lock().await.peers().to_vec()
    }

    /// Initialize the engine and arm the event loop.
    ///
    /// The gateway subscription is installed before `initialize` is issued
    /// so events raced against the command completion are not lost. On
    /// failure the session stays `Uninitialized` and every later command is
    /// rejected without touching the gateway.
    pub async fn init(&self) -> Result<(), HuddleError> {
        let mut st = self.state.lock().await;
        if *st != SessionState::Uninitialized {
            tracing::debug!("init ignored in state {:?}", *st);
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.engine.subscribe(Arc::new(EventForwarder { tx }));

        let handle = match self.engine.initialize(&self.config.app_id).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("engine initialization failed: {e}");
                drop(subscription);
                return Err(e);
            }
        };

        *self.handle.lock().await = Some(handle.clone());
        *st = SessionState::EngineReady;
        drop(st);
        *self.subscription.lock().unwrap() = Some(subscription);
        tracing::info!("engine initialized");
        self.emitter
            .emit(HuddleEvent::StateChanged(SessionState::EngineReady));

        if let Err(e) = self.engine.enable_video(&handle).await {
            tracing::warn!("enable_video rejected: {e}");
        }

        let task = tokio::spawn(Self::event_loop(
            rx,
            self.state.clone(),
            self.roster.clone(),
            self.expected_channel.clone(),
            self.emitter.clone(),
        ));
        *self.event_task.lock().unwrap() = Some(task);
        Ok(())
    }

    /// Ask the engine to join the configured channel.
    ///
    /// Moves to `Joining` before the command is issued; the transition to
    /// `Joined` only happens on the engine's join-success event. Calls while
    /// a join is already in flight or active are no-ops, so rapid repeated
    /// taps issue exactly one `join_channel`.
    pub async fn start_call(&self) -> Result<SessionState, HuddleError> {
        {
            let mut st = self.state.lock().await;
            match *st {
                SessionState::Uninitialized => return Err(HuddleError::NotReady),
                SessionState::Joining | SessionState::Joined | SessionState::Leaving => {
                    tracing::debug!("start_call ignored in state {:?}", *st);
                    return Ok(*st);
                }
                SessionState::EngineReady => {}
            }
            *st = SessionState::Joining;
            *self.expected_channel.lock().await = Some(self.config.channel.clone());
        }
        tracing::info!("joining channel {}", self.config.channel);
        self.emitter
            .emit(HuddleEvent::StateChanged(SessionState::Joining));

        let handle = self.engine_handle().await?;
        if let Err(e) = self
            .engine
            .join_channel(
                &handle,
                &self.config.token,
                &self.config.channel,
                None,
                self.config.local_uid,
            )
            .await
        {
            tracing::warn!("join_channel rejected: {e}");
        }
        Ok(SessionState::Joining)
    }

    /// Leave the channel.
    ///
    /// The leave is locally authoritative: the session resets the roster and
    /// returns to `EngineReady` as soon as the command is issued, without
    /// waiting for engine confirmation. No-op unless currently `Joined`.
    pub async fn end_call(&self) -> Result<SessionState, HuddleError> {
        {
            let mut st = self.state.lock().await;
            if *st == SessionState::Uninitialized {
                return Err(HuddleError::NotReady);
            }
            if *st != SessionState::Joined {
                tracing::debug!("end_call ignored in state {:?}", *st);
                return Ok(*st);
            }
            *st = SessionState::Leaving;
        }
        tracing::info!("leaving channel {}", self.config.channel);
        self.emitter
            .emit(HuddleEvent::StateChanged(SessionState::Leaving));

        let handle = self.engine_handle().await?;
        if let Err(e) = self.engine.leave_channel(&handle).await {
            tracing::warn!("leave_channel rejected: {e}");
        }

        self.roster.lock().await.reset();
        *self.expected_channel.lock().await = None;
        *self.state.lock().await = SessionState::EngineReady;
        self.emitter
            .emit(HuddleEvent::StateChanged(SessionState::EngineReady));
        Ok(SessionState::EngineReady)
    }

    /// Tear down the gateway subscription and stop the event loop.
    ///
    /// Listener removal is synchronous: once this returns, no stale handler
    /// can mutate this session's roster, and a new session may safely
    /// install its own subscriptions.
    pub fn shutdown(&self) {
        self.subscription.lock().unwrap().take();
        if let Some(task) = self.event_task.lock().unwrap().take() {
            task.abort();
        }
    }

    async fn engine_handle(&self) -> Result<EngineHandle, HuddleError> {
        self.handle.lock().await.clone().ok_or(HuddleError::NotReady)
    }

    async fn event_loop(
        mut events: mpsc::UnboundedReceiver<EngineEvent>,
        state: Arc<Mutex<SessionState>>,
        roster: Arc<Mutex<PeerRoster>>,
        expected_channel: Arc<Mutex<Option<String>>>,
        emitter: EventEmitter,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Ready => {
                    // The EngineReady transition is driven by initialize()
                    // completing; the event's ordering against that
                    // completion is unspecified, so it carries no state.
                    tracing::debug!("engine ready event");
                }

                EngineEvent::JoinChannelSuccess {
                    channel,
                    uid,
                    elapsed_ms,
                } => {
                    let mut st = state.lock().await;
                    let expected = expected_channel.lock().await;
                    if *st == SessionState::Joining
                        && expected.as_deref() == Some(channel.as_str())
                    {
                        *st = SessionState::Joined;
                        drop(expected);
                        drop(st);
                        tracing::info!("joined channel {channel} as uid {uid} ({elapsed_ms}ms)");
                        emitter.emit(HuddleEvent::StateChanged(SessionState::Joined));
                    } else {
                        tracing::debug!("ignoring join success for channel {channel}");
                    }
                }

                EngineEvent::UserJoined { uid, elapsed_ms } => {
                    // State lock held across the roster mutation so a
                    // concurrent end_call cannot reset between check and
                    // insert, which would leave a peer behind outside a call.
                    let st = state.lock().await;
                    if matches!(*st, SessionState::Joining | SessionState::Joined) {
                        let changed = roster.lock().await.on_user_joined(uid);
                        drop(st);
                        if changed {
                            tracing::info!("peer {uid} joined ({elapsed_ms}ms)");
                            emitter.emit(HuddleEvent::PeerJoined(uid));
                        }
                    } else {
                        tracing::debug!("residual user-joined for uid {uid} outside a call");
                    }
                }

                EngineEvent::UserOffline { uid, reason } => {
                    let st = state.lock().await;
                    if matches!(*st, SessionState::Joining | SessionState::Joined) {
                        let changed = roster.lock().await.on_user_offline(uid);
                        drop(st);
                        if changed {
                            tracing::info!("peer {uid} left (reason {reason})");
                            emitter.emit(HuddleEvent::PeerLeft(uid));
                        }
                    } else {
                        tracing::debug!("residual user-offline for uid {uid} outside a call");
                    }
                }
            }
        }
        tracing::debug!("session event loop ended");
    }
}
