//! Live connections and the identity each one has announced.

use std::{
    collections::HashMap,
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use tokio::sync::mpsc;

use crate::{
    error::DeliveryError,
    event::{Identity, OutboundEvent},
};

/// Our global unique connection id counter.
static NEXT_CONNECTION_ID: AtomicUsize = AtomicUsize::new(1);

/// Opaque handle the transport assigns to each socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(usize);

impl ConnectionId {
    /// Hands out a fresh, process-unique id.
    pub fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where outbound events for one connection are queued. The transport drains
/// the other end onto the socket.
pub type Outbox = mpsc::UnboundedSender<OutboundEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Connected,
    Identified,
    Disconnected,
}

#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    identity: Option<Identity>,
    lifecycle: Lifecycle,
    connected_at: Instant,
    outbox: Outbox,
}

impl Connection {
    fn new(id: ConnectionId, outbox: Outbox) -> Self {
        Connection {
            id,
            identity: None,
            lifecycle: Lifecycle::Connected,
            connected_at: Instant::now(),
            outbox,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Queues `event` for this connection without waiting on the socket.
    pub fn deliver(&self, event: OutboundEvent) -> Result<(), DeliveryError> {
        self.outbox
            .send(event)
            .map_err(|_| DeliveryError::Closed(self.id))
    }
}

/// Owns every `Connection` record.
#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<ConnectionId, Connection>,
}

impl Registry {
    /// Adds a connection in the `Connected` state. Registering an id twice
    /// keeps the first record and its outbox.
    pub fn register(&mut self, id: ConnectionId, outbox: Outbox) -> &Connection {
        self.connections
            .entry(id)
            .or_insert_with(|| Connection::new(id, outbox))
    }

    /// Returns `false` when `id` is unknown; the identity is then discarded.
    pub fn attach_identity(&mut self, id: ConnectionId, identity: Identity) -> bool {
        match self.connections.get_mut(&id) {
            Some(connection) => {
                connection.identity = Some(identity);
                connection.lifecycle = Lifecycle::Identified;
                true
            }
            None => false,
        }
    }

    /// Removes the record and hands it back marked `Disconnected`.
    /// Room membership is not touched here; see `Hub::unregister`.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id).map(|mut connection| {
            connection.lifecycle = Lifecycle::Disconnected;
            connection
        })
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbox() -> (Outbox, mpsc::UnboundedReceiver<OutboundEvent>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn register_is_idempotent() {
        let mut registry = Registry::default();
        let id = ConnectionId::next();
        let (first, mut first_rx) = outbox();
        let (second, _second_rx) = outbox();

        registry.register(id, first);
        registry.attach_identity(id, Identity::new("alice", "1"));
        let again = registry.register(id, second);

        assert_eq!(again.lifecycle(), Lifecycle::Identified);
        assert_eq!(again.identity(), Some(&Identity::new("alice", "1")));
        assert_eq!(registry.len(), 1);

        // the first outbox is the one still wired up
        let event = OutboundEvent::Broadcast {
            text: "hi".to_owned(),
            sender: Identity::new("alice", "1"),
        };
        registry.get(id).unwrap().deliver(event.clone()).unwrap();
        assert_eq!(first_rx.try_recv().unwrap(), event);
    }

    #[test]
    fn attach_identity_to_unknown_connection_is_ignored() {
        let mut registry = Registry::default();
        assert!(!registry.attach_identity(ConnectionId::next(), Identity::new("bob", "2")));
        assert!(registry.is_empty());
    }

    #[test]
    fn lifecycle_runs_connected_identified_disconnected() {
        let mut registry = Registry::default();
        let id = ConnectionId::next();
        let (tx, _rx) = outbox();

        assert_eq!(registry.register(id, tx).lifecycle(), Lifecycle::Connected);
        assert!(registry.attach_identity(id, Identity::new("carol", "3")));
        assert_eq!(registry.get(id).unwrap().lifecycle(), Lifecycle::Identified);

        let gone = registry.unregister(id).unwrap();
        assert_eq!(gone.lifecycle(), Lifecycle::Disconnected);
        assert!(!registry.contains(id));
        assert!(registry.unregister(id).is_none());
    }

    #[test]
    fn deliver_to_dropped_receiver_fails() {
        let mut registry = Registry::default();
        let id = ConnectionId::next();
        let (tx, rx) = outbox();
        registry.register(id, tx);
        drop(rx);

        let result = registry.get(id).unwrap().deliver(OutboundEvent::Broadcast {
            text: "lost".to_owned(),
            sender: Identity::new("dave", "4"),
        });
        assert!(matches!(result, Err(DeliveryError::Closed(c)) if c == id));
    }
}
