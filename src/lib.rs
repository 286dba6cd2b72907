//! A real-time chat relay: clients connect over a WebSocket, announce who
//! they are, join named rooms and exchange messages that the relay fans out
//! to everyone or to the members of one room.

pub mod api;
pub mod config;
pub mod error;
pub mod event;
pub mod registry;
pub mod rooms;
pub mod router;
pub mod wire;
pub mod ws;

pub use event::{Envelope, Identity, InboundEvent, OutboundEvent, Presence};
pub use registry::ConnectionId;
pub use router::{Flow, Relay, RoutingPolicy};
pub use wire::WireFormat;
