//! Wire protocol for Fresco
//!
//! Defines the JSON messages exchanged with a room server over a persistent
//! message connection. Every message is an object with a `type` discriminator.

mod error;
mod keys;
mod messages;

pub use error::IpcError;
pub use keys::encode_tile_key;
pub use messages::{ClientMessage, DabsPayload, KnownVersions, MAX_DAB_FLOATS, ServerMessage};
