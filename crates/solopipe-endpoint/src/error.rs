use solopipe_transport::TransportError;

/// Errors surfaced by pipe endpoint operations.
///
/// `Disconnected` and `Io` both leave the endpoint permanently closed;
/// every later call returns `Closed` without touching the socket.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Socket setup failed; no endpoint was created.
    #[error(transparent)]
    Setup(#[from] TransportError),

    /// The endpoint is already closed. No I/O was performed.
    #[error("endpoint is closed")]
    Closed,

    /// The peer disconnected before the transfer completed.
    #[error("peer disconnected mid-transfer ({transferred} of {expected} bytes)")]
    Disconnected { expected: usize, transferred: usize },

    /// A hard I/O error aborted the transfer.
    #[error("transfer failed: {0}")]
    Io(#[from] std::io::Error),

    /// The staged message does not fit in a 4-byte length prefix.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, EndpointError>;
