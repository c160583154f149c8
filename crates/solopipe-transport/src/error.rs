use std::io;

/// Errors that can occur while establishing a pipe connection.
///
/// Every variant is fatal to endpoint creation: no partially usable
/// connection is ever handed out.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create a socket descriptor.
    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),

    /// The pipe name does not fit in an abstract socket address.
    #[error("pipe name too long ({len} bytes, max {max}): {name:?}")]
    NameTooLong {
        name: String,
        len: usize,
        max: usize,
    },

    /// Failed to bind the abstract address.
    #[error("failed to bind abstract socket {name:?}: {source}")]
    Bind { name: String, source: io::Error },

    /// Failed to start listening.
    #[error("failed to listen on {name:?}: {source}")]
    Listen { name: String, source: io::Error },

    /// Failed to accept the peer connection.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    /// Failed to connect to a listening pipe.
    #[error("failed to connect to abstract socket {name:?}: {source}")]
    Connect { name: String, source: io::Error },
}

pub type Result<T> = std::result::Result<T, TransportError>;
