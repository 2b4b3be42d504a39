//! Byte relays between OS FIFOs and the raw endpoints.
//!
//! These sit outside the session: one feeds PCM from an upstream FIFO into
//! the raw input endpoint, the other drains the raw output endpoint into a
//! downstream FIFO.

use std::net::Shutdown;
use std::path::Path;

use pcmbridge_transport::{connect_with_retry, open_fifo_read, open_fifo_write, RetryPolicy};
use tracing::info;

use crate::error::RelayError;

/// Copy everything from the FIFO at `fifo` into the endpoint at `pipe`.
///
/// Opening the FIFO blocks until a writer appears. Returns the byte count
/// once the FIFO reaches EOF; the endpoint's write half is then shut down so
/// the session sees end-of-stream.
pub fn fifo_to_pipe(
    fifo: impl AsRef<Path>,
    pipe: impl AsRef<Path>,
    retry: &RetryPolicy,
) -> Result<u64, RelayError> {
    let (fifo, pipe) = (fifo.as_ref(), pipe.as_ref());
    let mut source = open_fifo_read(fifo)?;
    let mut sink = connect_with_retry(pipe, retry)?;
    info!(?fifo, ?pipe, "relaying fifo to pipe");

    let copied = std::io::copy(&mut source, &mut sink)?;
    sink.shutdown(Shutdown::Write)?;

    info!(bytes = copied, "fifo reached end of stream");
    Ok(copied)
}

/// Copy everything from the endpoint at `pipe` into the FIFO at `fifo`.
///
/// The endpoint is connected first, with `retry`, so a relay started ahead
/// of the session waits for it. Opening the FIFO then blocks until a reader
/// appears.
pub fn pipe_to_fifo(
    pipe: impl AsRef<Path>,
    fifo: impl AsRef<Path>,
    retry: &RetryPolicy,
) -> Result<u64, RelayError> {
    let (pipe, fifo) = (pipe.as_ref(), fifo.as_ref());
    let mut source = connect_with_retry(pipe, retry)?;
    let mut sink = open_fifo_write(fifo)?;
    info!(?pipe, ?fifo, "relaying pipe to fifo");

    let copied = std::io::copy(&mut source, &mut sink)?;

    info!(bytes = copied, "pipe closed");
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::path::PathBuf;
    use std::time::Duration;

    use pcmbridge_transport::{create_fifo, TransportError, UnixDomainSocket, DEFAULT_FIFO_MODE};

    use super::*;

    fn unique_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pcmbridge-relay-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            attempts: 100,
            attempt_timeout: Duration::from_millis(10),
        }
    }

    #[test]
    fn fifo_bytes_reach_the_pipe_then_eof() {
        let dir = unique_dir("in");
        let fifo = dir.join("in.fifo");
        let sock = dir.join("in.sock");
        create_fifo(&fifo, DEFAULT_FIFO_MODE).expect("fifo");
        let listener = UnixDomainSocket::bind(&sock).expect("bind");

        let writer_fifo = fifo.clone();
        let producer = std::thread::spawn(move || {
            let mut f = open_fifo_write(&writer_fifo).expect("open fifo for write");
            f.write_all(&[1, 2, 3, 4, 5]).expect("write fifo");
        });
        let relay_fifo = fifo.clone();
        let relay = std::thread::spawn(move || fifo_to_pipe(&relay_fifo, &sock, &quick_retry()));

        let mut stream = listener.accept().expect("accept");
        let mut received = Vec::new();
        stream.read_to_end(&mut received).expect("read until eof");

        assert_eq!(received, vec![1, 2, 3, 4, 5]);
        producer.join().expect("producer");
        assert_eq!(relay.join().expect("relay").expect("relay result"), 5);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn pipe_bytes_reach_the_fifo() {
        let dir = unique_dir("out");
        let fifo = dir.join("out.fifo");
        let sock = dir.join("out.sock");
        create_fifo(&fifo, DEFAULT_FIFO_MODE).expect("fifo");

        let relay_fifo = fifo.clone();
        let relay_sock = sock.clone();
        let relay =
            std::thread::spawn(move || pipe_to_fifo(&relay_sock, &relay_fifo, &quick_retry()));

        // Bind after the relay started: it must retry until we appear.
        std::thread::sleep(Duration::from_millis(30));
        let listener = UnixDomainSocket::bind(&sock).expect("bind");
        let server = std::thread::spawn(move || {
            let mut stream = listener.accept().expect("accept");
            stream.write_all(b"encoded").expect("write");
        });

        let mut reader = open_fifo_read(&fifo).expect("open fifo for read");
        let mut received = Vec::new();
        reader.read_to_end(&mut received).expect("read fifo");

        assert_eq!(received, b"encoded");
        server.join().expect("server");
        assert_eq!(relay.join().expect("relay").expect("relay result"), 7);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn pipe_to_fifo_gives_up_without_a_server() {
        let dir = unique_dir("absent");
        let policy = RetryPolicy {
            attempts: 2,
            attempt_timeout: Duration::from_millis(5),
        };

        let err = pipe_to_fifo(dir.join("absent.sock"), dir.join("never.fifo"), &policy)
            .unwrap_err();
        assert!(matches!(
            err,
            RelayError::Transport(TransportError::RetriesExhausted { attempts: 2, .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
