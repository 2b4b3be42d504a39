//! Decoder session management for pcmbridge.
//!
//! A session accepts the two raw-side clients, connects to the decoder
//! service, sends the one-time format handshake and then pumps raw chunks to
//! the decoder and decoded frames back out, one round trip at a time.

pub mod bridge;
pub mod connector;
pub mod error;
pub mod handshake;
pub mod listener;
pub mod relay;
pub mod session;

pub use bridge::{Bridge, BridgeConfig, BridgeReport, Termination};
pub use connector::connect_decoder;
pub use error::{BridgeError, HandshakeError, RelayError, Result, SessionError};
pub use handshake::{
    negotiate, Codec, CodecProfile, HandshakeRecord, HANDSHAKE_SIZE, PCM_BIT_DEPTH,
};
pub use listener::RawEndpoints;
pub use relay::{fifo_to_pipe, pipe_to_fifo};
pub use session::{
    Session, SessionConfig, DEFAULT_DECODER_PIPE, DEFAULT_INPUT_PIPE, DEFAULT_OUTPUT_PIPE,
};
