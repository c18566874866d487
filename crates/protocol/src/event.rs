//! Node event model
//!
//! An [`Event`] is one decoded occurrence from the upstream node: source and
//! time metadata plus a closed tagged-union payload. Events are immutable
//! after decode; the router serializes projections of them, it never hands
//! out ownership.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// A decoded occurrence from the upstream node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Identity of the producing node
    pub source: String,

    /// Node-assigned occurrence time (unix milliseconds)
    pub timestamp: i64,

    /// Variant-specific payload
    pub payload: EventPayload,
}

impl Event {
    /// Classify this event's variant into an [`EventType`]
    ///
    /// Exhaustive over the known variants; an unrecognized or unset variant
    /// fails with [`ProtocolError::UnmappedEventType`].
    pub fn event_type(&self) -> Result<EventType, ProtocolError> {
        match self.payload {
            EventPayload::ChainRegistration { .. } => Ok(EventType::ChainRegistration),
            EventPayload::EntryRegistration { .. } => Ok(EventType::EntryRegistration),
            EventPayload::EntryContentRegistration { .. } => {
                Ok(EventType::EntryContentRegistration)
            }
            EventPayload::BlockCommit { .. } => Ok(EventType::BlockCommit),
            EventPayload::ProcessMessage { .. } => Ok(EventType::ProcessMessage),
            EventPayload::NodeMessage { .. } => Ok(EventType::NodeMessage),
            EventPayload::Unknown => Err(ProtocolError::UnmappedEventType),
        }
    }
}

/// Variant payload of a node event
///
/// Internally tagged on `kind`, so the payload serializes as a single JSON
/// object with its fields inline. Wire payloads carrying a kind this build
/// does not know decode to [`EventPayload::Unknown`] rather than failing the
/// whole connection; the router rejects them per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    /// A new chain was registered on the node
    ChainRegistration {
        chain_id: String,
        entry_hash: String,
        external_ids: Vec<String>,
        content: String,
    },

    /// An entry was registered (hash only, content pending)
    EntryRegistration {
        chain_id: String,
        entry_hash: String,
    },

    /// An entry's content was registered
    EntryContentRegistration {
        chain_id: String,
        entry_hash: String,
        external_ids: Vec<String>,
        content: String,
    },

    /// A block was committed
    BlockCommit {
        block_height: u64,
        block_hash: String,
        entry_count: u32,
    },

    /// A message from the node's processing pipeline
    ProcessMessage {
        level: MessageLevel,
        code: u32,
        text: String,
    },

    /// A general node status message
    NodeMessage {
        level: MessageLevel,
        code: u32,
        text: String,
    },

    /// Unrecognized variant (forward-compatibility arm)
    #[serde(other)]
    Unknown,
}

/// Severity of a process or node message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Discriminant for the known event kinds
///
/// Used as the key of a subscription's filter map: a subscription receives
/// only events whose type appears in its filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ChainRegistration,
    EntryRegistration,
    EntryContentRegistration,
    BlockCommit,
    ProcessMessage,
    NodeMessage,
}

impl EventType {
    /// All known event types, in declaration order
    pub const ALL: [EventType; 6] = [
        EventType::ChainRegistration,
        EventType::EntryRegistration,
        EventType::EntryContentRegistration,
        EventType::BlockCommit,
        EventType::ProcessMessage,
        EventType::NodeMessage,
    ];

    /// Stable snake_case name, matching the wire `kind` tag
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ChainRegistration => "chain_registration",
            EventType::EntryRegistration => "entry_registration",
            EventType::EntryContentRegistration => "entry_content_registration",
            EventType::BlockCommit => "block_commit",
            EventType::ProcessMessage => "process_message",
            EventType::NodeMessage => "node_message",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chain_registration" => Ok(EventType::ChainRegistration),
            "entry_registration" => Ok(EventType::EntryRegistration),
            "entry_content_registration" => Ok(EventType::EntryContentRegistration),
            "block_commit" => Ok(EventType::BlockCommit),
            "process_message" => Ok(EventType::ProcessMessage),
            "node_message" => Ok(EventType::NodeMessage),
            _ => Err(ProtocolError::UnmappedEventType),
        }
    }
}

#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;
