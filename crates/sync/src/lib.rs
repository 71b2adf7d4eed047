//! Room synchronization for Fresco
//!
//! Connects a painting client to a room server: joins with the tiles it
//! already holds, applies authoritative tile patches, replays peers' dabs
//! into the echo layer and batches local dabs out to the room.

mod client;
mod dispatcher;
mod error;
mod reconnect;
mod session;
mod transport;

pub use client::{SessionHandle, SessionRunner, SessionStatus};
pub use dispatcher::{BatchDispatcher, FlushOutcome, MAX_BATCH_DABS};
pub use error::SyncError;
pub use reconnect::ReconnectPolicy;
pub use session::{
    ConnectionId, DebugInfo, PointerPhase, PointerSample, SessionCommand, SessionEvent,
    SessionState, SyncSession,
};
pub use transport::{ChannelTransport, Outbound};
