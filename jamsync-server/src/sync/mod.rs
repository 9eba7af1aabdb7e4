//! Live session synchronization
//!
//! - [`store`]: per-session state (line, transpose, tempo, members)
//! - [`hub`]: single task applying client events and fanning out results
//! - [`ws`]: WebSocket transport for the hub

pub mod hub;
pub mod store;
pub mod ws;

pub use hub::{Hub, HubCommand, HubHandle};
pub use store::{ConnectionId, SessionState, SessionStore};
