// src/server/state.rs

//! Application state for the backend server.
//!
//! Holds a reference to the broker actor address. Used to share state between
//! HTTP/WebSocket handlers and the actor system.

use actix::Addr;
use crate::server::broker::server::BrokerServer;

/// Shared application state, injected into HTTP/WebSocket handlers.
pub struct AppState {
    /// Address of the session broker actor (matchmaking, rooms, relay).
    pub broker_addr: Addr<BrokerServer>,
}

impl AppState {
    /// Create a new AppState with the given actor address.
    pub fn new(broker_addr: Addr<BrokerServer>) -> Self {
        AppState { broker_addr }
    }
}
