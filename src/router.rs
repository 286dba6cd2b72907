//! Routing policy: who receives what for every inbound event.
//!
//! `route` is a pure function of the event and the `Hub`; `Relay` wraps the
//! hub in a single lock and performs the fan-out.

use std::sync::Arc;

use log::{debug, info};
use tokio::sync::RwLock;

use crate::{
    error::DeliveryError,
    event::{Envelope, InboundEvent, OutboundEvent, Presence},
    registry::{Connection, ConnectionId, Outbox, Registry},
    rooms::RoomDirectory,
};

/// Registry and room directory, always mutated together.
#[derive(Debug, Default)]
pub struct Hub {
    registry: Registry,
    rooms: RoomDirectory,
}

impl Hub {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }

    pub fn register(&mut self, id: ConnectionId, outbox: Outbox) -> &Connection {
        self.registry.register(id, outbox)
    }

    /// Drops the connection and silently takes it out of every room.
    /// Returns the record and the rooms it was still in.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<(Connection, Vec<String>)> {
        let connection = self.registry.unregister(id)?;
        let rooms = self.rooms.remove_connection_from_all(id);
        Some((connection, rooms))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingPolicy {
    /// Drop room messages from connections that are not in the room.
    /// Off by default: clients are trusted to name their own rooms.
    pub enforce_membership: bool,
}

/// What the transport should do with the connection after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub recipients: Vec<ConnectionId>,
    pub event: OutboundEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    pub dispatch: Option<Dispatch>,
    pub flow: Flow,
}

impl Routing {
    fn silent() -> Self {
        Routing {
            dispatch: None,
            flow: Flow::Continue,
        }
    }

    fn send(recipients: Vec<ConnectionId>, event: OutboundEvent) -> Self {
        Routing {
            dispatch: Some(Dispatch { recipients, event }),
            flow: Flow::Continue,
        }
    }
}

pub fn route(
    hub: &mut Hub,
    policy: RoutingPolicy,
    from: ConnectionId,
    event: InboundEvent,
) -> Routing {
    if !hub.registry.contains(from) {
        debug!("dropping {} from unregistered connection {}", event.kind(), from);
        return Routing::silent();
    }

    match event {
        InboundEvent::Announce(identity) => {
            info!("connected: {} (connection {})", identity, from);
            hub.registry.attach_identity(from, identity);
            Routing::silent()
        }
        InboundEvent::Farewell(identity) => {
            match identity {
                Some(identity) => info!("disconnected: {} (connection {})", identity, from),
                None => info!("disconnected: connection {}", from),
            }
            Routing {
                dispatch: None,
                flow: Flow::Close,
            }
        }
        InboundEvent::Message(Envelope {
            text,
            sender,
            room: None,
        }) => {
            let mut everyone: Vec<_> = hub.registry.ids().collect();
            everyone.sort();
            Routing::send(everyone, OutboundEvent::Broadcast { text, sender })
        }
        InboundEvent::Message(Envelope {
            text,
            sender,
            room: Some(room),
        }) => {
            if room.is_empty() {
                return Routing::silent();
            }
            if policy.enforce_membership && !hub.rooms.is_member(&room, from) {
                debug!("connection {} is not in {:?}, dropping message", from, room);
                return Routing::silent();
            }
            let members = hub.rooms.members_of(&room);
            Routing::send(members, OutboundEvent::RoomMessage { room, text, sender })
        }
        InboundEvent::Join { room, who } => {
            if room.is_empty() {
                return Routing::silent();
            }
            let joined = hub.rooms.join(&room, from);
            if joined.newly_joined {
                info!("{} joined {:?}", who, room);
            } else {
                debug!("{} re-joined {:?}", who, room);
            }
            Routing::send(
                joined.members,
                OutboundEvent::Presence {
                    room,
                    who,
                    presence: Presence::Join,
                },
            )
        }
        InboundEvent::Leave { room, who } => match hub.rooms.leave(&room, from) {
            Some(remaining) => {
                info!("{} left {:?}", who, room);
                Routing::send(
                    remaining,
                    OutboundEvent::Presence {
                        room,
                        who,
                        presence: Presence::Leave,
                    },
                )
            }
            None => Routing::silent(),
        },
    }
}

/// Hands `dispatch.event` to every recipient independently. Returns how many
/// deliveries were queued.
pub fn fan_out(hub: &Hub, dispatch: Dispatch) -> usize {
    let Dispatch { recipients, event } = dispatch;
    let mut delivered = 0;
    for id in recipients {
        let result = hub
            .registry
            .get(id)
            .ok_or(DeliveryError::UnknownConnection(id))
            .and_then(|connection| connection.deliver(event.clone()));
        match result {
            Ok(()) => delivered += 1,
            Err(e) => debug!("dropping delivery: {}", e),
        }
    }
    delivered
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Stats {
    pub connections: usize,
    pub rooms: usize,
}

/// Shared handle to the relay state. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Relay {
    hub: Arc<RwLock<Hub>>,
    policy: RoutingPolicy,
}

impl Relay {
    pub fn new(policy: RoutingPolicy) -> Self {
        Relay {
            hub: Arc::default(),
            policy,
        }
    }

    /// Registers a new transport connection under a fresh id.
    pub async fn connect(&self, outbox: Outbox) -> ConnectionId {
        let id = ConnectionId::next();
        self.hub.write().await.register(id, outbox);
        id
    }

    pub async fn handle(&self, from: ConnectionId, event: InboundEvent) -> Flow {
        let kind = event.kind();
        let mut hub = self.hub.write().await;
        let routing = route(&mut hub, self.policy, from, event);
        if let Some(dispatch) = routing.dispatch {
            let recipients = dispatch.recipients.len();
            let delivered = fan_out(&hub, dispatch);
            debug!(
                "{} from connection {}: delivered to {}/{}",
                kind, from, delivered, recipients
            );
        }
        routing.flow
    }

    /// Ends the connection's lifecycle. Calling it twice is harmless.
    pub async fn disconnect(&self, id: ConnectionId) {
        if let Some((connection, rooms)) = self.hub.write().await.unregister(id) {
            let who = connection
                .identity()
                .map(ToString::to_string)
                .unwrap_or_else(|| "anonymous".to_owned());
            info!(
                "good bye connection {} ({}), connected for {}, left {} room(s)",
                id,
                who,
                humantime::format_duration(round_to_secs(connection.connected_for())),
                rooms.len()
            );
        }
    }

    pub async fn stats(&self) -> Stats {
        let hub = self.hub.read().await;
        Stats {
            connections: hub.registry.len(),
            rooms: hub.rooms.len(),
        }
    }

    pub async fn room_members(&self, room: &str) -> Vec<ConnectionId> {
        self.hub.read().await.rooms.members_of(room)
    }
}

fn round_to_secs(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_secs(d.as_secs())
}
