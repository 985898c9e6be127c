//! Protocol error types

use thiserror::Error;

/// Protocol and transport error
#[derive(Error, Debug)]
pub enum ProtoError {
    /// Socket I/O failed, including short reads at EOF
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No connection has been established
    #[error("not connected")]
    NotConnected,

    /// A connection is already active
    #[error("already connected")]
    AlreadyConnected,

    /// Address could not be resolved or connected to
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    /// Declared packet length is neither header-only nor header plus one block
    #[error("invalid packet length: {0}")]
    BadLength(u16),

    /// Opcode carries a command number outside the known set
    #[error("unknown command: {0}")]
    UnknownCommand(u32),

    /// Write-block packet arrived without its payload
    #[error("missing block payload for {0}")]
    MissingPayload(&'static str),
}

/// Result type for protocol operations
pub type ProtoResult<T> = Result<T, ProtoError>;
