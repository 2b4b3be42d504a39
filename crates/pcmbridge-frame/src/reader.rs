use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_prefix, Frame, FrameConfig, PREFIX_SIZE};
use crate::error::{FrameError, Result};

/// Outcome of filling a buffer from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadExact {
    /// The whole buffer was filled.
    Complete,
    /// EOF after `received` bytes (possibly zero).
    Closed { received: usize },
}

/// Outcome of reading a length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixRead {
    /// A full prefix declaring this many payload bytes.
    Length(i32),
    /// EOF on a frame boundary.
    Closed,
    /// EOF after part of a prefix.
    Truncated { received: usize },
}

/// Reads frames from any `Read` stream.
///
/// The bridge streams large payloads through a caller-owned buffer, so the
/// reader exposes prefix and payload reads separately. [`read_frame`] is the
/// buffered convenience for small messages.
///
/// [`read_frame`]: FrameReader::read_frame
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next length prefix (blocking).
    pub fn read_prefix(&mut self) -> Result<PrefixRead> {
        let mut prefix = [0u8; PREFIX_SIZE];
        match self.read_exact_or_closed(&mut prefix)? {
            ReadExact::Complete => {}
            ReadExact::Closed { received: 0 } => return Ok(PrefixRead::Closed),
            ReadExact::Closed { received } => return Ok(PrefixRead::Truncated { received }),
        }

        let declared = decode_prefix(prefix);
        if let Ok(len) = usize::try_from(declared) {
            if len > self.config.max_payload_size {
                return Err(FrameError::PayloadTooLarge {
                    size: len,
                    max: self.config.max_payload_size,
                });
            }
        }
        Ok(PrefixRead::Length(declared))
    }

    /// Fill `buf` completely, or report how much arrived before EOF.
    ///
    /// `Interrupted` reads are retried; every other I/O error is returned.
    pub fn read_exact_or_closed(&mut self, buf: &mut [u8]) -> Result<ReadExact> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => return Ok(ReadExact::Closed { received: filled }),
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(ReadExact::Complete)
    }

    /// Read one whole frame into memory (blocking).
    ///
    /// Returns `Ok(None)` on EOF between frames and
    /// `Err(FrameError::ConnectionClosed)` on EOF inside one.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let declared = match self.read_prefix()? {
            PrefixRead::Length(len) => len,
            PrefixRead::Closed => return Ok(None),
            PrefixRead::Truncated { .. } => return Err(FrameError::ConnectionClosed),
        };

        let len = usize::try_from(declared).unwrap_or(0);
        let mut payload = BytesMut::zeroed(len);
        match self.read_exact_or_closed(&mut payload)? {
            ReadExact::Complete => Ok(Some(Frame::new(payload.freeze()))),
            ReadExact::Closed { .. } => Err(FrameError::ConnectionClosed),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
