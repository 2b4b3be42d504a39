//! Bridge raw PCM between local pipes and a framed decoder channel.
//!
//! pcmbridge accepts unframed audio on one local endpoint, forwards it to a
//! decoder service as length-prefixed frames, and writes the decoder's
//! responses to a second endpoint.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix domain sockets, FIFOs, pipe-name resolution, connect retry
//! - [`frame`]: i32 little-endian length-prefixed framing
//! - [`session`]: handshake, streaming bridge, session orchestration and relays

/// Re-export transport types.
pub mod transport {
    pub use pcmbridge_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pcmbridge_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use pcmbridge_session::*;
}
