//! JSON wire format spoken over the WebSocket.
//!
//! Every frame is `{"event": "<name>", "payload": {...}}` using the event
//! names of the legacy chat front end. Payloads may carry the legacy
//! delimited strings (`"text:name-id"`, `"name-id"`) or structured objects.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use crate::{
    error::{WireError, WireResult},
    event::{Envelope, Identity, InboundEvent, OutboundEvent, Presence},
};

pub const GLOBAL_RESPONSE: &str = "event response";
pub const ROOM_RESPONSE: &str = "event response room";

/// Shape of outbound payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum WireFormat {
    /// `{"data": "text:name-id"}` and friends, as the legacy front end expects.
    #[default]
    Legacy,
    /// `{"text": ..., "sender": {"username": ..., "user_id": ...}}`.
    Structured,
}

#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DataPayload {
    data: Option<Data>,
    room: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JoinPayload {
    room: Option<String>,
    userjoin: Option<Who>,
}

#[derive(Debug, Deserialize)]
struct LeavePayload {
    room: Option<String>,
    userleave: Option<Who>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Data {
    Legacy(String),
    Structured {
        #[serde(default)]
        text: String,
        username: String,
        user_id: String,
    },
}

impl Data {
    fn into_parts(self) -> WireResult<(String, Identity)> {
        match self {
            Data::Legacy(data) => {
                let (text, who) = split_message(&data)?;
                Ok((text.to_owned(), who))
            }
            Data::Structured {
                text,
                username,
                user_id,
            } => Ok((text, Identity { username, user_id })),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Who {
    Legacy(String),
    Structured(Identity),
}

impl Who {
    fn into_identity(self) -> WireResult<Identity> {
        match self {
            Who::Legacy(s) => parse_identity(&s),
            Who::Structured(identity) => Ok(identity),
        }
    }
}

/// Parses `"<username>-<userid>"`. The id is whatever follows the last
/// hyphen; without a hyphen the whole string is the username.
pub fn parse_identity(s: &str) -> WireResult<Identity> {
    if s.is_empty() {
        return Err(WireError::Malformed {
            field: "identity",
            value: s.to_owned(),
        });
    }
    Ok(match s.rsplit_once('-') {
        Some((username, user_id)) => Identity::new(username, user_id),
        None => Identity::new(s, ""),
    })
}

/// Splits `"<text>:<username>-<userid>"` on its last colon.
pub fn split_message(data: &str) -> WireResult<(&str, Identity)> {
    let (text, who) = data.rsplit_once(':').ok_or_else(|| WireError::Malformed {
        field: "data",
        value: data.to_owned(),
    })?;
    Ok((text, parse_identity(who)?))
}

pub fn encode_message(text: &str, sender: &Identity) -> String {
    format!("{}:{}", text, sender)
}

pub fn decode(frame: &str) -> WireResult<InboundEvent> {
    let Frame { event, payload } = serde_json::from_str(frame)?;
    let event = match event.as_str() {
        "event connect" => {
            let payload: DataPayload = required_payload(payload)?;
            let (_, who) = required_data(payload.data)?.into_parts()?;
            InboundEvent::Announce(who)
        }
        "event broadcast" => {
            let payload: DataPayload = required_payload(payload)?;
            let (text, sender) = required_data(payload.data)?.into_parts()?;
            InboundEvent::Message(Envelope::broadcast(text, sender))
        }
        "event disconnect" => {
            // the announcement is informational; a missing or garbled one
            // still ends the session
            let who = payload
                .and_then(|payload| serde_json::from_value::<DataPayload>(payload).ok())
                .and_then(|payload| payload.data)
                .and_then(|data| data.into_parts().ok())
                .map(|(_, who)| who);
            InboundEvent::Farewell(who)
        }
        "join" => {
            let payload: JoinPayload = required_payload(payload)?;
            InboundEvent::Join {
                room: required_room(payload.room)?,
                who: payload
                    .userjoin
                    .ok_or(WireError::Missing("userjoin"))?
                    .into_identity()?,
            }
        }
        "leave" => {
            let payload: LeavePayload = required_payload(payload)?;
            InboundEvent::Leave {
                room: required_room(payload.room)?,
                who: payload
                    .userleave
                    .ok_or(WireError::Missing("userleave"))?
                    .into_identity()?,
            }
        }
        "event room" => {
            let payload: DataPayload = required_payload(payload)?;
            let room = required_room(payload.room)?;
            let (text, sender) = required_data(payload.data)?.into_parts()?;
            InboundEvent::Message(Envelope::to_room(room, text, sender))
        }
        _ => return Err(WireError::UnknownEvent(event)),
    };
    Ok(event)
}

fn required_payload<T: DeserializeOwned>(payload: Option<Value>) -> WireResult<T> {
    let payload = payload.ok_or(WireError::Missing("payload"))?;
    Ok(serde_json::from_value(payload)?)
}

fn required_data(data: Option<Data>) -> WireResult<Data> {
    data.ok_or(WireError::Missing("data"))
}

fn required_room(room: Option<String>) -> WireResult<String> {
    match room {
        Some(room) if !room.is_empty() => Ok(room),
        Some(room) => Err(WireError::Malformed { field: "room", value: room }),
        None => Err(WireError::Missing("room")),
    }
}

pub fn encode(event: &OutboundEvent, format: WireFormat) -> String {
    let (name, payload) = match format {
        WireFormat::Legacy => legacy_payload(event),
        WireFormat::Structured => structured_payload(event),
    };
    json!({ "event": name, "payload": payload }).to_string()
}

fn legacy_payload(event: &OutboundEvent) -> (&'static str, Value) {
    match event {
        OutboundEvent::Broadcast { text, sender } => (
            GLOBAL_RESPONSE,
            json!({ "data": encode_message(text, sender) }),
        ),
        OutboundEvent::Presence {
            room,
            who,
            presence: Presence::Join,
        } => (
            ROOM_RESPONSE,
            json!({ "data": room, "userjoin": who.to_string() }),
        ),
        OutboundEvent::Presence {
            room,
            who,
            presence: Presence::Leave,
        } => (
            ROOM_RESPONSE,
            json!({ "data": room, "userleave": who.to_string() }),
        ),
        OutboundEvent::RoomMessage { room, text, sender } => (
            ROOM_RESPONSE,
            json!({ "data": encode_message(text, sender), "chatroom": room }),
        ),
    }
}

fn structured_payload(event: &OutboundEvent) -> (&'static str, Value) {
    match event {
        OutboundEvent::Broadcast { text, sender } => (
            GLOBAL_RESPONSE,
            json!({ "text": text, "sender": sender }),
        ),
        OutboundEvent::Presence {
            room,
            who,
            presence,
        } => (
            ROOM_RESPONSE,
            json!({ "room": room, "presence": presence, "sender": who }),
        ),
        OutboundEvent::RoomMessage { room, text, sender } => (
            ROOM_RESPONSE,
            json!({ "room": room, "text": text, "sender": sender }),
        ),
    }
}
