//! Duplex transport to the inference service
//!
//! One persistent WebSocket per client session. Outgoing chunks are
//! serialized into typed JSON frames; incoming messages are parsed and
//! delivered in receive order as [`TransportEvent`]s.

mod channel;
mod messages;

pub use channel::{ConnectionState, TransportChannel, TransportEvent};
pub use messages::Frame;
