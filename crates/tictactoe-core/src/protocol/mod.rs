//! Protocol module containing message types, the text codec, and stream framing.

pub mod codec;
pub mod frame;
pub mod messages;

pub use codec::{
    decode_client_message, decode_discovery_record, decode_server_message, encode_client_message,
    encode_discovery_record, encode_server_message, validate_username, ProtocolError,
};
pub use frame::{read_frame, write_frame, FrameError, MAX_FRAME_SIZE};
pub use messages::*;
