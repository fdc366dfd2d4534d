//! HTTP and WebSocket routing configuration.
//!
//! Defines the single game endpoint. Static client assets are served by an
//! external collaborator, not by this process.

use actix_web::web;
use crate::server::session::ws_client;

/// Configure the application's WebSocket route.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/ws")
            .to(ws_client)
    );
}
