/// Session broker actor.
///
/// Owns the connection registry, the room store, and the random-match queue.
/// Every mutation of queue or room state runs on this actor's mailbox, so
/// joins, relays, goals, and disconnects are serialized against each other.
///
/// Core operations are plain methods returning `(connection, message)`
/// delivery lists; the actor handlers dispatch those through the session map.
use actix::prelude::*;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;
use log::{debug, info, warn};

use super::messages::ServerWsMessage;
use super::room::{Room, RoomState};
use super::score::{self, RoundVerdict};
use super::types::{BallState, MatchMode, Player, Side};
use crate::config::game::{BALL_SPAWN_X, BALL_SPAWN_Y};
use crate::server::session::ClientSession;

type SessionAddr = Addr<ClientSession>;

/// A message addressed to one connection, to be sent after the state change
/// that produced it is complete.
type Delivery = (Uuid, ServerWsMessage);

/// Per-connection context: where this connection currently sits.
///
/// Stored explicitly in the registry instead of being captured by handler
/// closures, so teardown is a map operation rather than a dangling capture.
#[derive(Debug, Default)]
struct ConnectionCtx {
    room_id: Option<Uuid>,
    side: Option<Side>,
}

/// Main session broker actor.
pub struct BrokerServer {
    /// Transport handles, keyed by connection id.
    sessions: HashMap<Uuid, SessionAddr>,
    /// Game-facing context per connection.
    contexts: HashMap<Uuid, ConnectionCtx>,
    /// Room store: every live room, Waiting or Active.
    rooms: HashMap<Uuid, Room>,
    /// FIFO of room ids holding exactly one player and awaiting a random
    /// opponent. Ids leave the queue the moment their room fills or dies.
    queue: VecDeque<Uuid>,
}

impl BrokerServer {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            contexts: HashMap::new(),
            rooms: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    /// Send each delivery to its connection, skipping connections whose
    /// transport is already gone.
    fn dispatch(&self, deliveries: Vec<Delivery>) {
        for (conn_id, msg) in deliveries {
            if let Some(addr) = self.sessions.get(&conn_id) {
                addr.do_send(msg);
            }
        }
    }

    /// Resolve a match request to a room and seat the caller in it.
    fn find_match(
        &mut self,
        conn_id: Uuid,
        mode: MatchMode,
        room_code: Option<String>,
        skin: String,
    ) -> Vec<Delivery> {
        if self.contexts.get(&conn_id).is_some_and(|c| c.room_id.is_some()) {
            warn!("[Broker] Connection {} requested a match while already seated", conn_id);
            return Vec::new();
        }

        let target = match mode {
            // Oldest waiting room first.
            MatchMode::Random => self.queue.pop_front(),
            // A private code only matches a live room with a free seat;
            // anything else (bad code, full room) opens a fresh room.
            MatchMode::Private => room_code
                .and_then(|code| Uuid::parse_str(&code).ok())
                .filter(|id| self.rooms.get(id).is_some_and(Room::has_space)),
        };

        match target {
            Some(room_id) => self.join_room(conn_id, room_id, skin),
            None => {
                let room_id = Uuid::new_v4();
                let deliveries = self.join_room(conn_id, room_id, skin);
                if mode == MatchMode::Random {
                    self.queue.push_back(room_id);
                }
                deliveries
            }
        }
    }

    /// Seat a connection in a room, creating the room if absent.
    ///
    /// On the Waiting -> Active transition both players learn about each
    /// other in the same delivery batch, so neither can start broadcasting
    /// before the other is initialized.
    fn join_room(&mut self, conn_id: Uuid, room_id: Uuid, skin: String) -> Vec<Delivery> {
        let room = self.rooms.entry(room_id).or_insert_with(|| Room::new(room_id));
        let Some(side) = room.free_side() else {
            debug!("[Broker] Connection {} refused: room {} is full", conn_id, room_id);
            return vec![(conn_id, ServerWsMessage::error("Room is unavailable"))];
        };
        if room.join(Player::spawn(conn_id, side, skin)).is_err() {
            return vec![(conn_id, ServerWsMessage::error("Room is unavailable"))];
        }
        self.contexts.insert(
            conn_id,
            ConnectionCtx { room_id: Some(room_id), side: Some(side) },
        );

        if room.state == RoomState::Active {
            // Full now, whether it was queued for a random match or joined
            // through a shared code.
            self.queue.retain(|id| *id != room_id);

            let newcomer = room.player(conn_id).cloned();
            let peer = room.opponent_of(conn_id).cloned();
            let (Some(newcomer), Some(peer)) = (newcomer, peer) else {
                return Vec::new();
            };
            info!("[Broker] Room {} active: {} vs {}", room_id, peer.id, newcomer.id);
            vec![
                (peer.id, ServerWsMessage::PlayerJoined(newcomer.clone())),
                (
                    peer.id,
                    ServerWsMessage::GameStart {
                        room_id,
                        self_player: peer.clone(),
                        opponents: vec![newcomer.clone()],
                    },
                ),
                (
                    conn_id,
                    ServerWsMessage::GameStart {
                        room_id,
                        self_player: newcomer,
                        opponents: vec![peer],
                    },
                ),
            ]
        } else {
            debug!("[Broker] Connection {} waiting in room {} as {:?}", conn_id, room_id, side);
            vec![(conn_id, ServerWsMessage::Waiting { room_id })]
        }
    }

    /// Unseat a connection from its room, if it has one. Safe to call twice;
    /// the second call finds no room and does nothing.
    fn leave(&mut self, conn_id: Uuid) -> Vec<Delivery> {
        let Some(ctx) = self.contexts.get_mut(&conn_id) else {
            return Vec::new();
        };
        let Some(room_id) = ctx.room_id.take() else {
            return Vec::new();
        };
        ctx.side = None;

        let mut deliveries = Vec::new();
        if let Some(room) = self.rooms.get_mut(&room_id) {
            if room.leave(conn_id).is_some() {
                if let Some(peer) = room.opponent_of(conn_id) {
                    deliveries.push((peer.id, ServerWsMessage::PlayerLeft { id: conn_id }));
                }
            }
            if room.is_empty() {
                self.rooms.remove(&room_id);
                self.queue.retain(|id| *id != room_id);
                debug!("[Broker] Room {} destroyed", room_id);
            }
        }
        deliveries
    }

    /// Forward a gameplay event to the sender's room peer. A sender with no
    /// live room (matchmaking incomplete, or already torn down) is a no-op.
    fn relay(&mut self, conn_id: Uuid, event: RelayEvent) -> Vec<Delivery> {
        let Some(room_id) = self.contexts.get(&conn_id).and_then(|c| c.room_id) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Vec::new();
        };

        let forwarded = match event {
            RelayEvent::Move { x, y } => {
                if let Some(player) = room.player_mut(conn_id) {
                    player.x = x;
                    player.y = y;
                }
                ServerWsMessage::UpdatePlayer { id: conn_id, x, y }
            }
            RelayEvent::SyncBall(ball) => ServerWsMessage::UpdateBall(ball),
            RelayEvent::Serve => ServerWsMessage::BallServed,
        };
        room.opponent_of(conn_id)
            .map(|peer| (peer.id, forwarded))
            .into_iter()
            .collect()
    }

    /// Apply a reported goal to the sender's room. The side string names the
    /// rally winner; unrecognized sides and stale senders are ignored.
    fn goal(&mut self, conn_id: Uuid, side_raw: &str) -> Vec<Delivery> {
        let Some(side) = Side::parse(side_raw) else {
            debug!("[Broker] Ignoring goal with unrecognized side {:?}", side_raw);
            return Vec::new();
        };
        let Some(room_id) = self.contexts.get(&conn_id).and_then(|c| c.room_id) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Vec::new();
        };

        let verdict = score::apply_goal(&mut room.score, side);
        let occupants: Vec<Uuid> = room.players().iter().map(|p| p.id).collect();
        let fan_out = |msg: ServerWsMessage| -> Vec<Delivery> {
            occupants.iter().map(|id| (*id, msg.clone())).collect()
        };

        let mut deliveries = Vec::new();
        match verdict {
            RoundVerdict::Continue { serve_side } => {
                deliveries.extend(fan_out(ServerWsMessage::ScoreUpdate(room.score)));
                deliveries.extend(fan_out(ServerWsMessage::ResetRound {
                    x: BALL_SPAWN_X,
                    y: BALL_SPAWN_Y,
                    serve_side: Some(serve_side),
                }));
            }
            RoundVerdict::MatchOver { winner, final_score } => {
                info!("[Broker] Room {} match over, winner {:?}", room_id, winner);
                deliveries.extend(fan_out(ServerWsMessage::ScoreUpdate(final_score)));
                deliveries.extend(fan_out(ServerWsMessage::GameOver { winner }));
                // Fresh match in the same room; the serve is free.
                deliveries.extend(fan_out(ServerWsMessage::ResetRound {
                    x: BALL_SPAWN_X,
                    y: BALL_SPAWN_Y,
                    serve_side: None,
                }));
            }
        }
        deliveries
    }
}

/// Sender-exclusive gameplay events the broker forwards without validation.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    Move { x: f32, y: f32 },
    SyncBall(BallState),
    Serve,
}

/// Message: a WebSocket session came up.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub conn_id: Uuid,
    pub addr: SessionAddr,
}

/// Message: a WebSocket session went away (close frame or heartbeat timeout).
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub conn_id: Uuid,
}

/// Message: client requests a match.
#[derive(Message)]
#[rtype(result = "()")]
pub struct FindMatch {
    pub conn_id: Uuid,
    pub mode: MatchMode,
    pub room_id: Option<String>,
    pub skin: String,
}

/// Message: client gameplay event to forward to the room peer.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Relay {
    pub conn_id: Uuid,
    pub event: RelayEvent,
}

/// Message: client reports a goal for one side.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ReportGoal {
    pub conn_id: Uuid,
    pub side: String,
}

impl Actor for BrokerServer {
    type Context = Context<Self>;
}

impl Handler<Connect> for BrokerServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) -> Self::Result {
        debug!("[Broker] Connection {} registered", msg.conn_id);
        self.sessions.insert(msg.conn_id, msg.addr);
        self.contexts.entry(msg.conn_id).or_default();
    }
}

impl Handler<Disconnect> for BrokerServer {
    type Result = ();

    /// Tears down the connection's room membership, then forgets it. May
    /// arrive mid-match; relay/goal events racing behind it become no-ops.
    fn handle(&mut self, msg: Disconnect, _ctx: &mut Self::Context) -> Self::Result {
        debug!("[Broker] Connection {} disconnected", msg.conn_id);
        let deliveries = self.leave(msg.conn_id);
        self.dispatch(deliveries);
        self.sessions.remove(&msg.conn_id);
        self.contexts.remove(&msg.conn_id);
    }
}

impl Handler<FindMatch> for BrokerServer {
    type Result = ();

    fn handle(&mut self, msg: FindMatch, _ctx: &mut Self::Context) -> Self::Result {
        let deliveries = self.find_match(msg.conn_id, msg.mode, msg.room_id, msg.skin);
        self.dispatch(deliveries);
    }
}

impl Handler<Relay> for BrokerServer {
    type Result = ();

    fn handle(&mut self, msg: Relay, _ctx: &mut Self::Context) -> Self::Result {
        let deliveries = self.relay(msg.conn_id, msg.event);
        self.dispatch(deliveries);
    }
}

impl Handler<ReportGoal> for BrokerServer {
    type Result = ();

    fn handle(&mut self, msg: ReportGoal, _ctx: &mut Self::Context) -> Self::Result {
        let deliveries = self.goal(msg.conn_id, &msg.side);
        self.dispatch(deliveries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::broker::types::Score;

    fn skin() -> String {
        "classic".to_string()
    }

    /// Seat two connections in one room via the random queue.
    fn paired_broker() -> (BrokerServer, Uuid, Uuid, Uuid) {
        let mut broker = BrokerServer::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        broker.find_match(a, MatchMode::Random, None, skin());
        let deliveries = broker.find_match(b, MatchMode::Random, None, skin());
        let room_id = match &deliveries[1].1 {
            ServerWsMessage::GameStart { room_id, .. } => *room_id,
            other => panic!("expected gameStart, got {:?}", other),
        };
        (broker, room_id, a, b)
    }

    #[test]
    fn random_pairing_assigns_left_then_right() {
        let mut broker = BrokerServer::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let first = broker.find_match(a, MatchMode::Random, None, skin());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0, a);
        assert!(matches!(first[0].1, ServerWsMessage::Waiting { .. }));
        assert_eq!(broker.queue.len(), 1);

        let second = broker.find_match(b, MatchMode::Random, None, skin());
        // playerJoined to the waiting peer, then gameStart to both.
        assert_eq!(second.len(), 3);
        assert!(matches!(
            &second[0],
            (id, ServerWsMessage::PlayerJoined(p)) if *id == a && p.id == b
        ));
        let (ServerWsMessage::GameStart { self_player: a_self, opponents: a_opps, .. },
             ServerWsMessage::GameStart { self_player: b_self, opponents: b_opps, .. }) =
            (&second[1].1, &second[2].1)
        else {
            panic!("expected two gameStart deliveries");
        };
        assert_eq!(second[1].0, a);
        assert_eq!(second[2].0, b);
        assert_eq!(a_self.side, Side::Left);
        assert_eq!(b_self.side, Side::Right);
        assert_eq!(a_opps[0].id, b);
        assert_eq!(b_opps[0].id, a);

        assert!(broker.queue.is_empty());
        let room = broker.rooms.values().next().unwrap();
        assert_eq!(room.state, RoomState::Active);
        assert_eq!(room.score, Score::default());
    }

    #[test]
    fn private_room_is_joinable_by_code_only() {
        let mut broker = BrokerServer::new();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let first = broker.find_match(host, MatchMode::Private, None, skin());
        let ServerWsMessage::Waiting { room_id } = first[0].1 else {
            panic!("expected waiting");
        };
        // Private rooms never enter the random queue.
        assert!(broker.queue.is_empty());

        let joined = broker.find_match(
            guest,
            MatchMode::Private,
            Some(room_id.to_string()),
            skin(),
        );
        assert_eq!(joined.len(), 3);
        assert_eq!(broker.rooms[&room_id].state, RoomState::Active);
    }

    #[test]
    fn private_code_for_full_room_opens_a_fresh_one() {
        let (mut broker, room_id, _a, _b) = paired_broker();
        let late = Uuid::new_v4();

        let deliveries =
            broker.find_match(late, MatchMode::Private, Some(room_id.to_string()), skin());
        let ServerWsMessage::Waiting { room_id: fresh } = deliveries[0].1 else {
            panic!("expected waiting in a fresh room");
        };
        assert_ne!(fresh, room_id);
        assert_eq!(broker.rooms[&room_id].players().len(), 2);
    }

    #[test]
    fn third_seat_is_refused_without_mutation() {
        let (mut broker, room_id, _a, _b) = paired_broker();
        let late = Uuid::new_v4();

        let deliveries = broker.join_room(late, room_id, skin());
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, late);
        assert!(matches!(deliveries[0].1, ServerWsMessage::Error { .. }));
        assert_eq!(broker.rooms[&room_id].players().len(), 2);
    }

    #[test]
    fn shared_code_of_a_queued_room_dequeues_it() {
        let mut broker = BrokerServer::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let first = broker.find_match(a, MatchMode::Random, None, skin());
        let ServerWsMessage::Waiting { room_id } = first[0].1 else {
            panic!("expected waiting");
        };
        // The waiting player shares the room id out-of-band.
        broker.find_match(b, MatchMode::Private, Some(room_id.to_string()), skin());
        assert!(broker.queue.is_empty());
        assert_eq!(broker.rooms[&room_id].state, RoomState::Active);
    }

    #[test]
    fn movement_is_relayed_to_peer_only_and_stored() {
        let (mut broker, room_id, a, b) = paired_broker();

        let deliveries = broker.relay(a, RelayEvent::Move { x: 250.0, y: 480.0 });
        assert_eq!(deliveries.len(), 1);
        assert!(matches!(
            &deliveries[0],
            (id, ServerWsMessage::UpdatePlayer { id: mover, x, y })
                if *id == b && *mover == a && *x == 250.0 && *y == 480.0
        ));
        let player = broker.rooms[&room_id].player(a).unwrap();
        assert_eq!((player.x, player.y), (250.0, 480.0));
    }

    #[test]
    fn serve_and_ball_sync_never_echo_to_sender() {
        let (mut broker, _room_id, a, b) = paired_broker();

        let serve = broker.relay(b, RelayEvent::Serve);
        assert_eq!(serve.len(), 1);
        assert!(matches!(serve[0], (id, ServerWsMessage::BallServed) if id == a));

        let ball = BallState { x: 400.0, y: 120.0, vx: -3.0, vy: 2.5 };
        let sync = broker.relay(a, RelayEvent::SyncBall(ball));
        assert_eq!(sync.len(), 1);
        assert_eq!(sync[0].0, b);
    }

    #[test]
    fn goal_updates_score_and_resets_round_toward_conceder() {
        let (mut broker, room_id, a, b) = paired_broker();

        let deliveries = broker.goal(a, "left");
        // scoreUpdate then resetRound, each fanned out to both occupants.
        assert_eq!(deliveries.len(), 4);
        assert!(matches!(
            deliveries[0].1,
            ServerWsMessage::ScoreUpdate(Score { left: 1, right: 0 })
        ));
        assert!(matches!(
            deliveries[2].1,
            ServerWsMessage::ResetRound { serve_side: Some(Side::Right), .. }
        ));
        let recipients: Vec<Uuid> = deliveries.iter().map(|(id, _)| *id).collect();
        assert!(recipients.contains(&a) && recipients.contains(&b));
        assert_eq!(broker.rooms[&room_id].score, Score { left: 1, right: 0 });
    }

    #[test]
    fn unrecognized_goal_side_is_ignored() {
        let (mut broker, room_id, a, _b) = paired_broker();
        let deliveries = broker.goal(a, "center");
        assert!(deliveries.is_empty());
        assert_eq!(broker.rooms[&room_id].score, Score::default());
    }

    #[test]
    fn match_over_resets_score_and_keeps_room_playable() {
        let (mut broker, room_id, a, b) = paired_broker();
        broker.rooms.get_mut(&room_id).unwrap().score = Score { left: 10, right: 0 };

        let deliveries = broker.goal(a, "left");
        // scoreUpdate, gameOver, resetRound, each to both occupants.
        assert_eq!(deliveries.len(), 6);
        assert!(matches!(
            deliveries[0].1,
            ServerWsMessage::ScoreUpdate(Score { left: 11, right: 0 })
        ));
        assert!(matches!(
            deliveries[2].1,
            ServerWsMessage::GameOver { winner: Side::Left }
        ));
        assert!(matches!(
            deliveries[4].1,
            ServerWsMessage::ResetRound { serve_side: None, .. }
        ));

        // Fresh match in the same room, no re-matchmaking needed.
        let room = &broker.rooms[&room_id];
        assert_eq!(room.score, Score::default());
        assert_eq!(room.state, RoomState::Active);
        assert_eq!(broker.relay(b, RelayEvent::Serve).len(), 1);
    }

    #[test]
    fn disconnect_mid_rally_notifies_peer_and_drops_stale_events() {
        let (mut broker, room_id, a, b) = paired_broker();

        let deliveries = broker.leave(a);
        assert_eq!(deliveries.len(), 1);
        assert!(matches!(
            deliveries[0],
            (id, ServerWsMessage::PlayerLeft { id: gone }) if id == b && gone == a
        ));

        // In-flight events from the departed connection are dropped silently.
        assert!(broker.relay(a, RelayEvent::Move { x: 1.0, y: 1.0 }).is_empty());
        assert!(broker.goal(a, "left").is_empty());
        assert!(broker.rooms.contains_key(&room_id));

        // Room dies with its last occupant.
        assert!(broker.leave(b).is_empty());
        assert!(!broker.rooms.contains_key(&room_id));
        assert!(broker.queue.is_empty());
    }

    #[test]
    fn leave_is_idempotent() {
        let (mut broker, _room_id, a, _b) = paired_broker();
        assert_eq!(broker.leave(a).len(), 1);
        assert!(broker.leave(a).is_empty());
    }

    #[test]
    fn waiting_room_disconnect_cleans_queue_silently() {
        let mut broker = BrokerServer::new();
        let a = Uuid::new_v4();
        broker.find_match(a, MatchMode::Random, None, skin());
        assert_eq!(broker.queue.len(), 1);

        let deliveries = broker.leave(a);
        assert!(deliveries.is_empty());
        assert!(broker.rooms.is_empty());
        assert!(broker.queue.is_empty());
    }

    #[test]
    fn second_find_match_while_seated_is_ignored() {
        let (mut broker, room_id, a, _b) = paired_broker();
        let deliveries = broker.find_match(a, MatchMode::Random, None, skin());
        assert!(deliveries.is_empty());
        assert_eq!(broker.rooms.len(), 1);
        assert_eq!(broker.rooms[&room_id].players().len(), 2);
    }

    #[test]
    fn queue_never_references_full_or_dead_rooms() {
        let mut broker = BrokerServer::new();
        let conns: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();

        // Interleave joins and disconnects.
        broker.find_match(conns[0], MatchMode::Random, None, skin());
        broker.find_match(conns[1], MatchMode::Random, None, skin());
        broker.find_match(conns[2], MatchMode::Random, None, skin());
        broker.leave(conns[2]);
        broker.find_match(conns[3], MatchMode::Random, None, skin());
        broker.find_match(conns[4], MatchMode::Random, None, skin());
        broker.leave(conns[0]);
        broker.find_match(conns[5], MatchMode::Random, None, skin());

        for id in &broker.queue {
            let room = broker.rooms.get(id).expect("queued id must name a live room");
            assert_eq!(room.players().len(), 1);
            assert_eq!(room.state, RoomState::Waiting);
        }
        for room in broker.rooms.values() {
            assert!(room.players().len() <= 2);
        }
    }
}
