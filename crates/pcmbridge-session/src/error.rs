use std::path::PathBuf;

use pcmbridge_frame::FrameError;
use pcmbridge_transport::TransportError;

use crate::bridge::Termination;

/// Errors from the format handshake.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The codec identifier has no known profile.
    #[error("unsupported codec '{0}' (expected eac3, ac3 or truehd)")]
    UnsupportedCodec(String),

    /// Writing or flushing the handshake record failed.
    #[error("failed to send handshake: {0}")]
    ChannelWrite(#[source] FrameError),
}

/// Errors that abort the streaming loop.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Reading from the raw input failed.
    #[error("raw input read failed: {0}")]
    InputRead(#[source] std::io::Error),

    /// Writing or flushing the raw output failed.
    #[error("raw output write failed: {0}")]
    OutputWrite(#[source] std::io::Error),

    /// Sending a frame to the decoder failed.
    #[error("decoder channel write failed: {0}")]
    ChannelWrite(#[source] FrameError),

    /// Reading a response from the decoder failed.
    #[error("decoder channel read failed: {0}")]
    ChannelRead(#[source] FrameError),
}

/// Errors surfaced at the session boundary.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The configuration was rejected before any I/O.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error while setting up the decoder channel.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The decoder never accepted a connection within the retry budget.
    #[error("decoder unreachable at {path} after {attempts} attempts")]
    DecoderUnreachable { path: PathBuf, attempts: u32 },

    /// Handshake failed.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// Streaming failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The decoder stopped mid-frame and the session treats that as failure.
    #[error("decoder closed the channel mid-frame ({0})")]
    DecoderTruncated(Termination),

    /// A streaming or accept worker thread panicked.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

/// Errors from the FIFO relay utilities.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Opening or connecting an endpoint failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Copying bytes failed.
    #[error("relay I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
