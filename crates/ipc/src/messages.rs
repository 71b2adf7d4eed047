//! Message enums for client <-> room server traffic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::IpcError;

/// Largest flat dab array a server accepts in one `dabs` message
pub const MAX_DAB_FLOATS: usize = 4096;

/// `"tx,ty"` -> version, as reported in `join`
pub type KnownVersions = BTreeMap<String, u64>;

/// Messages from the client to the room server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Handshake, sent exactly once per connection
    Join {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        /// Tiles the client already holds, so the server can send only newer ones
        #[serde(default)]
        known: KnownVersions,
    },

    /// A batch of stroke dabs
    Dabs(DabsPayload),
}

/// Messages from the room server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full raster replacement for one tile
    TilePatch {
        tx: i32,
        ty: i32,
        version: u64,
        /// Base64 of the encoded raster
        png_base64: String,
    },

    /// A peer's batched stroke segment
    Dabs(DabsPayload),

    /// Informational metadata for display
    Debug {
        #[serde(default)]
        port: Option<u16>,
        #[serde(default)]
        room_id: Option<String>,
    },

    /// Any type this client does not understand
    #[serde(other)]
    Unknown,
}

/// Body of a `dabs` message
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DabsPayload {
    /// 0 = paint, 1 = erase. Other values paint.
    #[serde(default)]
    pub tool: i64,
    /// `[x, y, radius, weight]` quadruples, concatenated
    pub dabs: Vec<f32>,
}

impl DabsPayload {
    pub fn new(tool: i64, dabs: Vec<f32>) -> Self {
        Self { tool, dabs }
    }

    /// Number of complete dabs
    pub fn dab_count(&self) -> usize {
        self.dabs.len() / 4
    }

    /// Reject arrays with a trailing partial dab
    pub fn validate(&self) -> Result<(), IpcError> {
        if self.dabs.len() % 4 != 0 {
            return Err(IpcError::MalformedDabs(self.dabs.len()));
        }
        Ok(())
    }
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, IpcError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode once at the boundary. Unknown types become [`ServerMessage::Unknown`].
    pub fn from_json(text: &str) -> Result<Self, IpcError> {
        Ok(serde_json::from_str(text)?)
    }
}
