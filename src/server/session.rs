/// WebSocket session handler for one connection.
///
/// This actor owns a single client's socket for the lifetime of the network
/// session. It registers the connection with the broker on start, deregisters
/// on stop, parses client messages into typed broker events, and serializes
/// server messages back to the client. It also runs the heartbeat that turns
/// silently-dropped transports into disconnects.
use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::session::{CLIENT_TIMEOUT_SECS, HEARTBEAT_INTERVAL_SECS};
use crate::server::broker::messages::{ClientWsMessage, ServerWsMessage};
use crate::server::broker::server::{
    BrokerServer, Connect, Disconnect, FindMatch, Relay, RelayEvent, ReportGoal,
};
use crate::server::ws_error::ws_error_message;

/// Represents one client's WebSocket session.
pub struct ClientSession {
    pub conn_id: Uuid,
    pub broker_addr: Addr<BrokerServer>,
    last_heartbeat: Instant,
}

impl ClientSession {
    pub fn new(conn_id: Uuid, broker_addr: Addr<BrokerServer>) -> Self {
        ClientSession {
            conn_id,
            broker_addr,
            last_heartbeat: Instant::now(),
        }
    }

    /// Ping the client on an interval; stop the session when the last pong is
    /// too old. Stopping triggers `stopped`, which tears down room state.
    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS), |act, ctx| {
            if act.last_heartbeat.elapsed() > Duration::from_secs(CLIENT_TIMEOUT_SECS) {
                log::info!("[Session] Connection {} timed out, dropping", act.conn_id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for ClientSession {
    type Context = ws::WebsocketContext<Self>;

    /// Called when the session starts. Registers the connection with the broker.
    fn started(&mut self, ctx: &mut Self::Context) {
        self.broker_addr.do_send(Connect {
            conn_id: self.conn_id,
            addr: ctx.address(),
        });
        self.start_heartbeat(ctx);
    }

    /// Called when the session stops. The broker reclaims the connection's
    /// room, which may already be gone; that is fine.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.broker_addr.do_send(Disconnect { conn_id: self.conn_id });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ClientSession {
    /// Handles incoming WebSocket messages from the client.
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                // Parse the client message as JSON and forward it as a typed
                // broker event.
                match serde_json::from_str::<ClientWsMessage>(&text) {
                    Ok(ClientWsMessage::FindMatch { mode, room_id, skin }) => {
                        self.broker_addr.do_send(FindMatch {
                            conn_id: self.conn_id,
                            mode,
                            room_id,
                            skin,
                        });
                    }
                    Ok(ClientWsMessage::Move { x, y }) => {
                        self.broker_addr.do_send(Relay {
                            conn_id: self.conn_id,
                            event: RelayEvent::Move { x, y },
                        });
                    }
                    Ok(ClientWsMessage::SyncBall(ball)) => {
                        self.broker_addr.do_send(Relay {
                            conn_id: self.conn_id,
                            event: RelayEvent::SyncBall(ball),
                        });
                    }
                    Ok(ClientWsMessage::Serve) => {
                        self.broker_addr.do_send(Relay {
                            conn_id: self.conn_id,
                            event: RelayEvent::Serve,
                        });
                    }
                    Ok(ClientWsMessage::Goal { side }) => {
                        self.broker_addr.do_send(ReportGoal {
                            conn_id: self.conn_id,
                            side,
                        });
                    }
                    Err(_e) => {
                        // Invalid client message format.
                        ctx.text(ws_error_message(
                            "INVALID_MESSAGE",
                            "Invalid client message",
                            None,
                        ));
                    }
                }
            }
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(_)) => ctx.stop(),
            _ => (),
        }
    }
}

impl Handler<ServerWsMessage> for ClientSession {
    type Result = ();

    /// Handles messages sent from the broker to this session.
    fn handle(&mut self, msg: ServerWsMessage, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg) {
            Ok(text) => ctx.text(text),
            Err(e) => {
                // Serialization error: notify client and close connection.
                log::error!("Failed to serialize ServerWsMessage: {}", e);
                ctx.text(ws_error_message("INTERNAL", "Internal server error", None));
                ctx.close(Some(ws::CloseReason {
                    code: ws::CloseCode::Error,
                    description: Some("Internal server error".into()),
                }));
                ctx.stop();
            }
        }
    }
}

/// WebSocket endpoint for game clients.
///
/// The connection id is assigned here, at the transport boundary, and lives
/// exactly as long as the network session.
pub async fn ws_client(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<crate::server::state::AppState>,
) -> Result<HttpResponse, Error> {
    let conn_id = Uuid::new_v4();
    ws::start(
        ClientSession::new(conn_id, data.broker_addr.clone()),
        &req,
        stream,
    )
}
