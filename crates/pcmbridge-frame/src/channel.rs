use std::io::{Read, Write};

use pcmbridge_transport::{IpcStream, TransportError};

use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};
use crate::reader::{FrameReader, PrefixRead, ReadExact};
use crate::writer::FrameWriter;

/// A duplex framed channel: one reader half and one writer half.
///
/// The halves are separate types so tests can script the inbound side and
/// capture the outbound side independently.
pub struct FramedChannel<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
}

impl<R: Read, W: Write> FramedChannel<R, W> {
    /// Build a channel from separate read and write halves.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, FrameConfig::default())
    }

    /// Build a channel with explicit configuration for both halves.
    pub fn with_config(reader: R, writer: W, config: FrameConfig) -> Self {
        Self {
            reader: FrameReader::with_config(reader, config.clone()),
            writer: FrameWriter::with_config(writer, config),
        }
    }

    /// Frame and send one payload, flushed.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.writer.send(payload)
    }

    /// Write an unframed record, flushed.
    pub fn write_record(&mut self, record: &[u8]) -> Result<()> {
        self.writer.write_record(record)
    }

    /// Read the next length prefix.
    pub fn read_prefix(&mut self) -> Result<PrefixRead> {
        self.reader.read_prefix()
    }

    /// Fill `buf` from the inbound side, or report early EOF.
    pub fn read_exact_or_closed(&mut self, buf: &mut [u8]) -> Result<ReadExact> {
        self.reader.read_exact_or_closed(buf)
    }

    /// Borrow the reader half.
    pub fn reader_mut(&mut self) -> &mut FrameReader<R> {
        &mut self.reader
    }

    /// Borrow the writer half.
    pub fn writer_mut(&mut self) -> &mut FrameWriter<W> {
        &mut self.writer
    }

    /// Split into the underlying streams.
    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }
}

impl FramedChannel<IpcStream, IpcStream> {
    /// Build a channel over one connected duplex stream.
    pub fn from_stream(stream: IpcStream, config: FrameConfig) -> Result<Self> {
        let reader = stream.try_clone().map_err(transport_to_frame_error)?;
        Ok(Self::with_config(reader, stream, config))
    }
}

fn transport_to_frame_error(err: TransportError) -> FrameError {
    match err {
        TransportError::Io(io) | TransportError::Accept(io) => FrameError::Io(io),
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Fifo { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn halves_are_independent() {
        let inbound = vec![3, 0, 0, 0, b'a', b'b', b'c'];
        let mut channel = FramedChannel::new(Cursor::new(inbound), Vec::<u8>::new());

        channel.send(b"xy").unwrap();
        assert_eq!(channel.read_prefix().unwrap(), PrefixRead::Length(3));
        let mut buf = [0u8; 3];
        assert_eq!(
            channel.read_exact_or_closed(&mut buf).unwrap(),
            ReadExact::Complete
        );
        assert_eq!(&buf, b"abc");

        let (_, sent) = channel.into_parts();
        assert_eq!(sent, vec![2, 0, 0, 0, b'x', b'y']);
    }

    #[test]
    #[cfg(unix)]
    fn from_stream_talks_to_peer() {
        let (local, remote) = IpcStream::pair().unwrap();
        let mut ours = FramedChannel::from_stream(local, FrameConfig::default()).unwrap();
        let mut theirs = FramedChannel::from_stream(remote, FrameConfig::default()).unwrap();

        ours.send(b"request").unwrap();
        let frame = theirs.reader_mut().read_frame().unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"request");

        theirs.send(b"response").unwrap();
        let frame = ours.reader_mut().read_frame().unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"response");
    }
}
