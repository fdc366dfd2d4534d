/// WebSocket session configuration constants.
///
/// A transport that vanishes without a close frame would otherwise leave its
/// Waiting room behind forever; the heartbeat turns silent drops into
/// disconnects.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 5; // Ping cadence per connection.

/// Time (in seconds) without a pong before a connection is dropped.
pub const CLIENT_TIMEOUT_SECS: u64 = 30;
