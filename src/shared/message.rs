/**
 * Streaming Frame Types
 *
 * This module defines the JSON frames exchanged on the sync channel.
 * Every frame starts with the same header: the file it concerns and a
 * numeric message type used for dispatch before the body is decoded.
 */

use serde::{Deserialize, Serialize};

use crate::shared::diff::Chunk;

/// Numeric frame type carried in the header `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum MessageType {
    Chunk = 0,
    Create = 1,
    Delete = 2,
    Rename = 3,
    Cursor = 4,
}

impl From<MessageType> for i64 {
    fn from(kind: MessageType) -> Self {
        kind as i64
    }
}

impl TryFrom<i64> for MessageType {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::Chunk),
            1 => Ok(MessageType::Create),
            2 => Ok(MessageType::Delete),
            3 => Ok(MessageType::Rename),
            4 => Ok(MessageType::Cursor),
            other => Err(format!("unknown message type: {other}")),
        }
    }
}

/// Header common to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    pub file_id: i64,
    #[serde(rename = "type")]
    pub kind: MessageType,
}

/// An edit authored against `version`, carrying the chunk list to apply.
/// The server broadcasts the (possibly rebased) list back with the newly
/// assigned version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    pub chunks: Vec<Chunk>,
    pub version: i64,
}

/// A file lifecycle event (create/delete/rename), relayed to workspace
/// peers without touching the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    pub workspace_path: String,
    pub object_type: String,
}

/// A peer cursor update. Editor-local presentation fields pass through the
/// server untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    pub path: String,
    pub label: String,
    pub color: String,
    pub line: i64,
    pub ch: i64,
    pub id: String,
}
