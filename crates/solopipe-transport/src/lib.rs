//! Socket plumbing and reliable transfer primitives for solopipe.
//!
//! This is the lowest layer of solopipe. It provides two things:
//! - [`read_full`] / [`write_full`]: loop-until-complete I/O over any
//!   `Read`/`Write`, absorbing signal interruptions and partial transfers.
//! - [`serve_once`] / [`connect`]: a Linux abstract-namespace Unix domain
//!   socket that accepts exactly one peer per name, and its client half.
//!
//! Everything blocks. There are no timeouts and no retry loops beyond the
//! interrupted-call case; closing the peer or the process is the escape
//! hatch.

pub mod error;
#[cfg(target_os = "linux")]
pub mod sock;
pub mod xfer;

pub use error::{Result, TransportError};
#[cfg(target_os = "linux")]
pub use sock::{connect, serve_once};
pub use xfer::{read_full, write_full};
