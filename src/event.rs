//! Structured events flowing through the relay.
//!
//! Nothing here knows about the delimited `"text:name-id"` strings the legacy
//! front end speaks; `wire` converts at the socket boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who a client claims to be. Supplied by the client, never verified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub user_id: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, user_id: impl Into<String>) -> Self {
        Identity {
            username: username.into(),
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.username, self.user_id)
    }
}

/// One chat message for the duration of a single routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub text: String,
    pub sender: Identity,
    /// `None` means the message goes to everyone.
    pub room: Option<String>,
}

impl Envelope {
    pub fn broadcast(text: impl Into<String>, sender: Identity) -> Self {
        Envelope {
            text: text.into(),
            sender,
            room: None,
        }
    }

    pub fn to_room(room: impl Into<String>, text: impl Into<String>, sender: Identity) -> Self {
        Envelope {
            text: text.into(),
            sender,
            room: Some(room.into()),
        }
    }
}

/// Events a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `event connect`: the client tells us who it is.
    Announce(Identity),
    /// `event broadcast` or `event room`, depending on `Envelope::room`.
    Message(Envelope),
    /// `event disconnect`: the client wants its session ended.
    Farewell(Option<Identity>),
    Join { room: String, who: Identity },
    Leave { room: String, who: Identity },
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Announce(_) => "connect-announce",
            InboundEvent::Message(Envelope { room: None, .. }) => "broadcast",
            InboundEvent::Message(Envelope { room: Some(_), .. }) => "room-message",
            InboundEvent::Farewell(_) => "disconnect-announce",
            InboundEvent::Join { .. } => "join",
            InboundEvent::Leave { .. } => "leave",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Join,
    Leave,
}

/// Events the relay hands to the transport for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// message-broadcast
    Broadcast { text: String, sender: Identity },
    /// room-presence
    Presence {
        room: String,
        who: Identity,
        presence: Presence,
    },
    /// room-message
    RoomMessage {
        room: String,
        text: String,
        sender: Identity,
    },
}
