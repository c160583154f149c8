//! Growable staging buffer for length-prefixed IPC messages.
//!
//! A [`WireBuf`] is an in-memory byte sequence with an explicit write length
//! and an independent read position. Senders assemble a message with the
//! typed `put_*` helpers, then hand the whole buffer to an endpoint to
//! transmit as one length-prefixed frame.
//!
//! All multi-byte fields are little-endian on the wire.

pub mod buf;

pub use buf::{WireBuf, DEFAULT_CAPACITY, LINEAR_GROWTH_STEP};
