//! Protocol module containing the message types and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_client_message, encode_server_message, ProtocolError};
pub use messages::*;
