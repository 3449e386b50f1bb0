//! Error types for the storage layer.

/// Errors that can occur while reading or writing durable storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read, written, or renamed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded, or the backing file is not valid JSON.
    #[error("storage encoding failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
