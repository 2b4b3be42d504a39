use std::path::Path;
use std::sync::mpsc;

use pcmbridge_transport::{IpcStream, UnixDomainSocket};
use tracing::{info, warn};

use crate::error::{Result, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Input,
    Output,
}

/// The two raw-side server endpoints of a session.
///
/// The input endpoint receives unframed PCM from an upstream relay; the
/// output endpoint hands decoded bytes to a downstream relay. Each accepts
/// exactly one client.
pub struct RawEndpoints {
    input: UnixDomainSocket,
    output: UnixDomainSocket,
}

impl RawEndpoints {
    /// Bind both endpoints.
    pub fn bind(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Self> {
        let input = UnixDomainSocket::bind(input)?;
        let output = UnixDomainSocket::bind(output)?;
        Ok(Self { input, output })
    }

    pub fn input_path(&self) -> &Path {
        self.input.path()
    }

    pub fn output_path(&self) -> &Path {
        self.output.path()
    }

    /// Wait for a client on each endpoint, in whichever order they arrive.
    ///
    /// Blocks with no timeout until both accepts have finished or one of them
    /// fails. Returns the `(input, output)` streams; the listening sockets are
    /// closed afterwards.
    pub fn wait_for_clients(self) -> Result<(IpcStream, IpcStream)> {
        info!(
            input = ?self.input.path(),
            output = ?self.output.path(),
            "waiting for raw clients"
        );
        accept_both(&self.input, &self.output, UnixDomainSocket::accept)
    }
}

fn accept_both<F>(
    input: &UnixDomainSocket,
    output: &UnixDomainSocket,
    accept: F,
) -> Result<(IpcStream, IpcStream)>
where
    F: Fn(&UnixDomainSocket) -> pcmbridge_transport::Result<IpcStream> + Sync,
{
    let (tx, rx) = mpsc::channel();
    std::thread::scope(|scope| {
        let accept = &accept;
        let handles: Vec<_> = [(Side::Input, input), (Side::Output, output)]
            .into_iter()
            .map(|(side, socket)| {
                let tx = tx.clone();
                scope.spawn(move || {
                    let _ = tx.send((side, accept(socket)));
                })
            })
            .collect();
        drop(tx);

        let mut input_stream = None;
        let mut output_stream = None;
        for (side, accepted) in rx.iter() {
            match accepted {
                Ok(stream) => {
                    info!(?side, "raw client connected");
                    match side {
                        Side::Input => input_stream = Some(stream),
                        Side::Output => output_stream = Some(stream),
                    }
                }
                Err(err) => {
                    warn!(?side, error = %err, "accept failed");
                    let other = match side {
                        Side::Input => output,
                        Side::Output => input,
                    };
                    // Unblocks the other accept so the scope can join it.
                    let _ = UnixDomainSocket::connect(other.path());
                    return Err(err.into());
                }
            }
        }

        match (input_stream, output_stream) {
            (Some(input), Some(output)) => Ok((input, output)),
            // A sender went away without reporting: its accept thread panicked.
            // Joining here takes the panic so the scope does not re-raise it.
            _ => {
                for handle in handles {
                    let _ = handle.join();
                }
                Err(SessionError::WorkerPanicked)
            }
        }
    })
}
