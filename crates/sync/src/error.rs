use fresco_ipc::IpcError;
use painting::TileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Transport closed")]
    Closed,

    #[error("Protocol error: {0}")]
    Protocol(#[from] IpcError),

    #[error("Tile decode failed: {0}")]
    Tile(#[from] TileError),
}
