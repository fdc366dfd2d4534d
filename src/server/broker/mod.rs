/// Broker module: matchmaking queue, room store, relay engine, and scoring.

pub mod server;
pub mod messages;
pub mod types;
pub mod room;
pub mod score;

pub use server::BrokerServer;
