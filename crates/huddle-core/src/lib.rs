//! Huddle call-session core.
//!
//! Owns the call-session state machine and the peer-presence roster.
//! The media engine sits behind the [`gateway::EngineGateway`] trait and
//! the rendering shell consumes the read surface and event stream of
//! [`session::CallSession`].

pub mod config;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod peers;
pub mod session;

pub use config::CallConfig;
pub use errors::HuddleError;
pub use events::{HuddleEvent, HuddleEventListener, SessionState, Subscription};
pub use gateway::{EngineEvent, EngineEventListener, EngineGateway, EngineHandle};
pub use peers::PeerRoster;
pub use session::CallSession;
