use std::fmt;
use std::io;

use pcmbridge_frame::FrameError;
use pcmbridge_session::{BridgeError, HandshakeError, RelayError, SessionError};
use pcmbridge_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Fifo { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::RetriesExhausted { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::DecoderUnreachable { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        SessionError::Handshake(HandshakeError::UnsupportedCodec(_)) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        SessionError::Handshake(HandshakeError::ChannelWrite(err)) => {
            frame_error(&format!("{context}: handshake"), err)
        }
        SessionError::Bridge(BridgeError::InputRead(err)) => {
            io_error(&format!("{context}: raw input"), err)
        }
        SessionError::Bridge(BridgeError::OutputWrite(err)) => {
            io_error(&format!("{context}: raw output"), err)
        }
        SessionError::Bridge(BridgeError::ChannelWrite(err))
        | SessionError::Bridge(BridgeError::ChannelRead(err)) => {
            frame_error(&format!("{context}: decoder channel"), err)
        }
        SessionError::DecoderTruncated(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        SessionError::WorkerPanicked => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn relay_error(context: &str, err: RelayError) -> CliError {
    match err {
        RelayError::Transport(err) => transport_error(context, err),
        RelayError::Io(err) => io_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pcmbridge_session::Termination;

    use super::*;

    #[test]
    fn unsupported_codec_is_data_invalid() {
        let err = SessionError::from(HandshakeError::UnsupportedCodec("mp3".to_string()));
        let cli = session_error("session failed", err);
        assert_eq!(cli.code, DATA_INVALID);
        assert!(cli.message.contains("mp3"));
    }

    #[test]
    fn unreachable_decoder_is_timeout() {
        let err = SessionError::DecoderUnreachable {
            path: PathBuf::from("/tmp/CoreFxPipe_CavernPipe"),
            attempts: 20,
        };
        assert_eq!(session_error("session failed", err).code, TIMEOUT);

        let err = RelayError::Transport(TransportError::RetriesExhausted {
            path: PathBuf::from("/tmp/x.sock"),
            attempts: 3,
        });
        assert_eq!(relay_error("relay failed", err).code, TIMEOUT);
    }

    #[test]
    fn raw_side_disconnect_is_failure() {
        let err = SessionError::Bridge(BridgeError::OutputWrite(io::Error::from(
            io::ErrorKind::BrokenPipe,
        )));
        let cli = session_error("session failed", err);
        assert_eq!(cli.code, FAILURE);
        assert!(cli.message.contains("raw output"));
    }

    #[test]
    fn permission_denied_on_bind() {
        let err = SessionError::Transport(TransportError::Bind {
            path: PathBuf::from("/root/nope.sock"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        });
        assert_eq!(session_error("session failed", err).code, PERMISSION_DENIED);
    }

    #[test]
    fn strict_truncation_and_config_codes() {
        let err = SessionError::DecoderTruncated(Termination::DecoderTruncatedPrefix {
            received: 2,
        });
        assert_eq!(session_error("session failed", err).code, FAILURE);

        let err = SessionError::InvalidConfig("input chunk size must be positive".to_string());
        assert_eq!(session_error("session failed", err).code, USAGE);
    }
}
