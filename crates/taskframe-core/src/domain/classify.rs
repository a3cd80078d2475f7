//! Envelope classification.
//!
//! The channel is shared with arbitrary third-party traffic, so classification
//! is total: every raw value maps to either a recognized catalog message for the
//! expected direction or `Unrecognized`. It never panics and never errors.

use serde::de::DeserializeOwned;

use super::message::{Direction, HostMessage, MESSAGE_PREFIX, MessageType, TaskMessage};

/// A catalog half: the messages one side is allowed to receive.
pub trait Catalog: DeserializeOwned {
    const DIRECTION: Direction;
}

impl Catalog for HostMessage {
    const DIRECTION: Direction = Direction::HostToTask;
}

impl Catalog for TaskMessage {
    const DIRECTION: Direction = Direction::TaskToHost;
}

/// Why a value was not recognized. Only used for debug logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnrecognizedReason {
    NotAnObject,
    MissingType,
    ForeignPrefix,
    UnknownType(String),
    WrongDirection(MessageType),
    MalformedPayload(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classified<M> {
    Recognized(M),
    Unrecognized(UnrecognizedReason),
}

impl<M> Classified<M> {
    pub fn recognized(self) -> Option<M> {
        match self {
            Classified::Recognized(m) => Some(m),
            Classified::Unrecognized(_) => None,
        }
    }
}

/// Cheap pre-filter: does the value look like a protocol message at all?
///
/// Used by generic listeners that want every protocol message regardless of
/// direction.
pub fn has_protocol_tag(raw: &serde_json::Value) -> bool {
    raw.get("type")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|t| t.starts_with(MESSAGE_PREFIX))
}

pub fn classify<M: Catalog>(raw: &serde_json::Value) -> Classified<M> {
    let Some(obj) = raw.as_object() else {
        return Classified::Unrecognized(UnrecognizedReason::NotAnObject);
    };
    let Some(tag) = obj.get("type").and_then(serde_json::Value::as_str) else {
        return Classified::Unrecognized(UnrecognizedReason::MissingType);
    };
    if !tag.starts_with(MESSAGE_PREFIX) {
        return Classified::Unrecognized(UnrecognizedReason::ForeignPrefix);
    }
    let Some(message_type) = MessageType::from_wire(tag) else {
        return Classified::Unrecognized(UnrecognizedReason::UnknownType(tag.to_string()));
    };
    if message_type.direction() != M::DIRECTION {
        return Classified::Unrecognized(UnrecognizedReason::WrongDirection(message_type));
    }

    match M::deserialize(raw) {
        Ok(message) => Classified::Recognized(message),
        Err(e) => Classified::Unrecognized(UnrecognizedReason::MalformedPayload(e.to_string())),
    }
}
