//! Server-pushed change feed over Supabase Realtime.
//!
//! The listener joins one channel carrying `postgres_changes` for the configured tables
//! and fires a payload-less signal for every matching change. Transport failures are
//! retried forever with exponential backoff.

mod connection;
mod encoding;
mod listener;

pub use connection::RealtimeConnection;
pub use encoding::{
    InboundMessage, PHOENIX_TOPIC, PROTOCOL_VERSION, PhoenixMessage, build_heartbeat_message,
    build_join_message, build_leave_message, build_topic, parse_message,
};
pub use listener::{ChangeFeedHandle, ChangeFeedListener, SubscriptionState};
