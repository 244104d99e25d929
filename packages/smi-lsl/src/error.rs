use thiserror::Error;

use crate::sdk::ReturnCode;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("iViewX SDK library not found: {0}")]
    LibraryNotFound(String),

    #[error("Failed to load iViewX SDK library: {0}")]
    LibraryLoad(String),

    #[error("{call} failed: {code}")]
    Sdk {
        call: &'static str,
        code: ReturnCode,
    },

    #[error("Could not connect to iViewX: {0}")]
    Connection(ReturnCode),

    #[error("SDK callbacks are already owned by another tracker instance")]
    CallbacksInUse,

    #[error("Outlet error: {0}")]
    Outlet(String),

    #[error("Channel count mismatch for stream '{stream}': expected {expected}, got {actual}")]
    ChannelMismatch {
        stream: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
