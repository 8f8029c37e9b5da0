//! Wire protocol for Chatline.
//!
//! This crate defines the "language" that the chat client and server speak:
//!
//! - **Types** ([`OutgoingRequest`], [`IncomingEvent`]): the messages that
//!   travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to and from wire text.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (frames of text) and session
//! (connection lifecycle). It doesn't know about sockets or threads; every
//! function here is pure.
//!
//! ```text
//! Transport (frames) → Protocol (IncomingEvent) → Session (listener events)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AUTH_TYPE, IncomingEvent, MESSAGE_TYPE, OutgoingRequest, describe_malformed,
};
