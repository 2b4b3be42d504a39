use std::path::Path;

use pcmbridge_transport::{connect_with_retry, IpcStream, RetryPolicy, TransportError};
use tracing::info;

use crate::error::{Result, SessionError};

/// Connect to the decoder service, retrying while it is not yet listening.
///
/// Exhausting the retry budget is reported as
/// [`SessionError::DecoderUnreachable`]; other connect failures come back as
/// transport errors without further attempts.
pub fn connect_decoder(path: impl AsRef<Path>, policy: &RetryPolicy) -> Result<IpcStream> {
    let path = path.as_ref();
    info!(
        ?path,
        attempts = policy.attempts,
        attempt_timeout_ms = policy.attempt_timeout.as_millis() as u64,
        budget_ms = policy.budget().as_millis() as u64,
        "connecting to decoder"
    );

    let stream = connect_with_retry(path, policy).map_err(|err| match err {
        TransportError::RetriesExhausted { path, attempts } => {
            SessionError::DecoderUnreachable { path, attempts }
        }
        other => SessionError::Transport(other),
    })?;

    info!(
        ?path,
        decoder_pid = stream.peer_credentials().map(|(_, _, pid)| pid),
        "connected to decoder"
    );
    Ok(stream)
}
