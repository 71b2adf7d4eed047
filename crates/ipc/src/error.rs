//! Error types for wire encoding and decoding.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("Failed to (de)serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Dab array length {0} is not a multiple of 4")]
    MalformedDabs(usize),
}
