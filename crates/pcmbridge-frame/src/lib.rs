//! Length-prefixed message framing for the decoder channel.
//!
//! Every message in either direction is a 4-byte little-endian signed length
//! followed by that many payload bytes. A non-positive length carries no
//! payload and means "nothing for this request".
//!
//! Reads report how a stream ended (cleanly between frames, or partway
//! through one) instead of collapsing both into an error.

pub mod channel;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use channel::FramedChannel;
pub use codec::{
    decode_frame, decode_prefix, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD,
    PREFIX_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::{FrameReader, PrefixRead, ReadExact};
pub use writer::FrameWriter;
