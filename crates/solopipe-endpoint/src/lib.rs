//! Single-connection pipe endpoint.
//!
//! A [`PipeEndpoint`] is one end of a byte-stream pipe between two
//! cooperating local processes. The serving side accepts exactly one peer
//! and then stops listening; both sides exchange fixed-width little-endian
//! scalars and length-prefixed frames through the typed read/write calls.
//!
//! Failure is terminal by design: any transfer that moves fewer bytes than
//! requested closes the endpoint permanently. Callers that need the channel
//! back create a new endpoint under a fresh name.

pub mod endpoint;
pub mod error;

pub use endpoint::PipeEndpoint;
pub use error::{EndpointError, Result};
