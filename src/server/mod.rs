// src/server/mod.rs

//! Server layer root module.
//!
//! This module organizes the main backend server components, including:
//! - Application state management
//! - HTTP/WebSocket routing
//! - Per-connection WebSocket sessions
//! - The session broker (matchmaking, room lifecycle, event relay, scoring)

pub mod state;
pub mod router;
pub mod session;
pub mod broker;
pub mod ws_error;
