use std::fmt;
use std::io;

use solopipe_endpoint::EndpointError;
use solopipe_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Socket(source)
        | TransportError::Accept(source)
        | TransportError::Bind { source, .. }
        | TransportError::Listen { source, .. }
        | TransportError::Connect { source, .. } => io_error(context, source),
        TransportError::NameTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn endpoint_error(context: &str, err: EndpointError) -> CliError {
    match err {
        EndpointError::Setup(err) => transport_error(context, err),
        EndpointError::Io(source) => io_error(context, source),
        EndpointError::MessageTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        EndpointError::Closed | EndpointError::Disconnected { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}
