use std::time::Duration;

/// Bounded retry for clients that may start before their server.
///
/// A named pipe client on Windows blocks in `Connect(timeout)` until the
/// server appears. A Unix socket connect fails immediately instead, so each
/// failed attempt waits out the remainder of `attempt_timeout` before the next
/// one. The total budget is therefore roughly `attempts * attempt_timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of connect attempts. Zero is treated as one.
    pub attempts: u32,
    /// Time allotted to each attempt.
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Upper bound on the time spent retrying.
    pub fn budget(&self) -> Duration {
        self.attempt_timeout.saturating_mul(self.attempts.max(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            attempt_timeout: Duration::from_millis(500),
        }
    }
}

#[cfg(unix)]
pub use unix::connect_with_retry;

#[cfg(unix)]
mod unix {
    use std::io::ErrorKind;
    use std::path::Path;
    use std::time::Instant;

    use tracing::{debug, info};

    use super::RetryPolicy;
    use crate::error::{Result, TransportError};
    use crate::traits::IpcStream;
    use crate::uds::UnixDomainSocket;

    /// Connect to `path`, retrying while no server is listening there.
    ///
    /// Only "not found" and "connection refused" are retried. Anything else
    /// (permissions, a path that is not a socket) fails on the spot.
    pub fn connect_with_retry(path: impl AsRef<Path>, policy: &RetryPolicy) -> Result<IpcStream> {
        let path = path.as_ref();
        let attempts = policy.attempts.max(1);

        for attempt in 1..=attempts {
            let started = Instant::now();
            match UnixDomainSocket::connect(path) {
                Ok(stream) => {
                    info!(?path, attempt, "connected");
                    return Ok(stream);
                }
                Err(TransportError::Connect { source, .. }) if is_not_listening(source.kind()) => {
                    debug!(?path, attempt, attempts, error = %source, "server not listening yet");
                    if attempt < attempts {
                        let remaining = policy.attempt_timeout.saturating_sub(started.elapsed());
                        std::thread::sleep(remaining);
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(TransportError::RetriesExhausted {
            path: path.to_path_buf(),
            attempts,
        })
    }

    fn is_not_listening(kind: ErrorKind) -> bool {
        matches!(kind, ErrorKind::NotFound | ErrorKind::ConnectionRefused)
    }

}
