use std::fmt;
use std::io::{ErrorKind, Read, Write};

use pcmbridge_frame::{FramedChannel, PrefixRead, ReadExact};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::BridgeError;

/// Largest raw chunk forwarded to the decoder per round trip.
pub const DEFAULT_INPUT_CHUNK_SIZE: usize = 20_000;
/// Working buffer for streaming decoder responses to the output.
pub const DEFAULT_OUTPUT_CHUNK_SIZE: usize = 64 * 1024;
/// Frames between progress lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Buffer sizes and reporting cadence for the streaming loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Maximum bytes read from the raw input per round trip.
    pub input_chunk_size: usize,
    /// Maximum bytes of a response held in memory at once.
    pub output_chunk_size: usize,
    /// Log a progress line every this many output frames. Zero disables it.
    pub progress_interval: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            input_chunk_size: DEFAULT_INPUT_CHUNK_SIZE,
            output_chunk_size: DEFAULT_OUTPUT_CHUNK_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Why the streaming loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The raw input reached end-of-stream.
    InputEnded,
    /// The decoder closed the channel between frames.
    DecoderClosed,
    /// The decoder closed the channel partway through a length prefix.
    DecoderTruncatedPrefix { received: usize },
    /// The decoder closed the channel before delivering the declared payload.
    DecoderTruncatedPayload { declared: usize, received: usize },
}

impl Termination {
    /// True when the stream ended on a frame boundary.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::InputEnded | Self::DecoderClosed)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputEnded => f.write_str("raw input ended"),
            Self::DecoderClosed => f.write_str("decoder closed the channel"),
            Self::DecoderTruncatedPrefix { received } => {
                write!(f, "length prefix cut off after {received} of 4 bytes")
            }
            Self::DecoderTruncatedPayload { declared, received } => {
                write!(f, "payload cut off after {received} of {declared} bytes")
            }
        }
    }
}

/// Counters for one bridge run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeReport {
    /// Raw chunks sent to the decoder.
    pub requests: u64,
    /// Responses that carried output and were written in full.
    pub frames: u64,
    /// Responses with a non-positive length.
    pub empty_responses: u64,
    /// Raw bytes forwarded to the decoder.
    pub bytes_in: u64,
    /// Decoded bytes written to the output.
    pub bytes_out: u64,
    pub termination: Termination,
}

/// The request/response pump between raw endpoints and the decoder.
///
/// Exactly one request is in flight at a time: the decoder is stateful and
/// each response belongs to the chunk sent just before it.
#[derive(Debug, Clone, Default)]
pub struct Bridge {
    config: BridgeConfig,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Pump until the input ends or the decoder goes away.
    ///
    /// Must only be called after the handshake has been sent. Raw-side I/O
    /// errors and decoder-side I/O errors are fatal; a decoder that closes the
    /// channel is not, and the way it closed is reported in
    /// [`BridgeReport::termination`].
    pub fn run<I, O, R, W>(
        &self,
        input: &mut I,
        output: &mut O,
        decoder: &mut FramedChannel<R, W>,
    ) -> Result<BridgeReport, BridgeError>
    where
        I: Read,
        O: Write,
        R: Read,
        W: Write,
    {
        let mut in_buf = vec![0u8; self.config.input_chunk_size.max(1)];
        let mut out_buf = vec![0u8; self.config.output_chunk_size.max(1)];
        let mut report = BridgeReport {
            requests: 0,
            frames: 0,
            empty_responses: 0,
            bytes_in: 0,
            bytes_out: 0,
            termination: Termination::InputEnded,
        };

        info!(
            input_chunk_size = in_buf.len(),
            output_chunk_size = out_buf.len(),
            "streaming started"
        );

        report.termination = loop {
            let read = read_input(input, &mut in_buf)?;
            if read == 0 {
                break Termination::InputEnded;
            }

            decoder
                .send(&in_buf[..read])
                .map_err(BridgeError::ChannelWrite)?;
            report.requests += 1;
            report.bytes_in += read as u64;

            let declared = match decoder.read_prefix().map_err(BridgeError::ChannelRead)? {
                PrefixRead::Length(len) => len,
                PrefixRead::Closed => break Termination::DecoderClosed,
                PrefixRead::Truncated { received } => {
                    break Termination::DecoderTruncatedPrefix { received }
                }
            };

            let Ok(declared) = usize::try_from(declared) else {
                report.empty_responses += 1;
                continue;
            };
            if declared == 0 {
                report.empty_responses += 1;
                continue;
            }

            let mut remaining = declared;
            let mut truncated = None;
            while remaining > 0 {
                let chunk = remaining.min(out_buf.len());
                match decoder
                    .read_exact_or_closed(&mut out_buf[..chunk])
                    .map_err(BridgeError::ChannelRead)?
                {
                    ReadExact::Complete => {
                        output
                            .write_all(&out_buf[..chunk])
                            .map_err(BridgeError::OutputWrite)?;
                        report.bytes_out += chunk as u64;
                        remaining -= chunk;
                    }
                    ReadExact::Closed { received } => {
                        truncated = Some(Termination::DecoderTruncatedPayload {
                            declared,
                            received: declared - remaining + received,
                        });
                        break;
                    }
                }
            }
            output.flush().map_err(BridgeError::OutputWrite)?;

            if let Some(termination) = truncated {
                break termination;
            }

            report.frames += 1;
            if self.config.progress_interval > 0
                && report.frames % self.config.progress_interval == 0
            {
                info!(
                    frames = report.frames,
                    last_out = declared,
                    bytes_out = report.bytes_out,
                    "streaming progress"
                );
            }
        };

        info!(
            requests = report.requests,
            frames = report.frames,
            termination = %report.termination,
            "streaming finished"
        );
        Ok(report)
    }
}

fn read_input<I: Read>(input: &mut I, buf: &mut [u8]) -> Result<usize, BridgeError> {
    loop {
        match input.read(buf) {
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == ErrorKind::Interrupted => {
                debug!("raw input read interrupted; retrying");
            }
            Err(err) => return Err(BridgeError::InputRead(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};
    use pcmbridge_frame::{decode_frame, encode_frame, FrameError, DEFAULT_MAX_PAYLOAD};

    use super::*;

    /// Records everything written and counts flushes.
    #[derive(Default)]
    struct Sink {
        bytes: Vec<u8>,
        flushes: usize,
    }

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    fn responses(frames: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for payload in frames {
            encode_frame(payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn sent_frames(wire: Vec<u8>) -> Vec<Vec<u8>> {
        let mut wire = BytesMut::from(wire.as_slice());
        let mut out = Vec::new();
        while let Some(frame) = decode_frame(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap() {
            out.push(frame.payload.to_vec());
        }
        assert!(wire.is_empty());
        out
    }

    fn pseudo_random(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn hundred_byte_chunk_fifty_byte_response() {
        let raw = pseudo_random(100, 1);
        let reply = pseudo_random(50, 2);
        let mut input = Cursor::new(raw.clone());
        let mut output = Sink::default();
        let mut decoder =
            FramedChannel::new(Cursor::new(responses(&[&reply])), Vec::<u8>::new());

        let report = Bridge::default()
            .run(&mut input, &mut output, &mut decoder)
            .unwrap();

        assert_eq!(output.bytes, reply);
        assert_eq!(output.flushes, 1);
        assert_eq!(report.frames, 1);
        assert_eq!(report.bytes_in, 100);
        assert_eq!(report.bytes_out, 50);
        assert_eq!(report.termination, Termination::InputEnded);

        let (_, sent) = decoder.into_parts();
        assert_eq!(sent_frames(sent), vec![raw]);
    }

    #[test]
    fn response_payload_round_trips_through_read_path() {
        for (len, chunk) in [(1, 7), (65_536, 65_536), (65_537, 65_536), (200_000, 4096)] {
            let payload = pseudo_random(len, len as u32);
            let mut input = Cursor::new(vec![0u8; 10]);
            let mut output = Sink::default();
            let mut decoder =
                FramedChannel::new(Cursor::new(responses(&[&payload])), Vec::<u8>::new());
            let bridge = Bridge::new(BridgeConfig {
                output_chunk_size: chunk,
                ..BridgeConfig::default()
            });

            let report = bridge.run(&mut input, &mut output, &mut decoder).unwrap();

            assert_eq!(output.bytes, payload, "len {len}");
            assert_eq!(output.flushes, 1, "len {len}");
            assert_eq!(report.termination, Termination::InputEnded);
        }
    }

    #[test]
    fn non_positive_lengths_write_nothing() {
        let mut wire = BytesMut::new();
        wire.put_i32_le(0);
        wire.put_i32_le(-5);
        wire.put_i32_le(i32::MIN);
        encode_frame(b"tail", &mut wire).unwrap();

        let bridge = Bridge::new(BridgeConfig {
            input_chunk_size: 10,
            ..BridgeConfig::default()
        });
        let mut input = Cursor::new(vec![7u8; 40]);
        let mut output = Sink::default();
        let mut decoder = FramedChannel::new(Cursor::new(wire.to_vec()), Vec::<u8>::new());

        let report = bridge.run(&mut input, &mut output, &mut decoder).unwrap();

        // Three empty replies consume only their prefixes; the fourth chunk
        // gets "tail", so the empties never swallowed any following bytes.
        assert_eq!(output.bytes, b"tail");
        assert_eq!(output.flushes, 1);
        assert_eq!(report.empty_responses, 3);
        assert_eq!(report.frames, 1);
        assert_eq!(report.requests, 4);
        assert_eq!(report.termination, Termination::InputEnded);
    }

    #[test]
    fn empty_input_sends_nothing() {
        let mut input = Cursor::new(Vec::<u8>::new());
        let mut output = Sink::default();
        let mut decoder = FramedChannel::new(Cursor::new(Vec::<u8>::new()), Vec::<u8>::new());

        let report = Bridge::default()
            .run(&mut input, &mut output, &mut decoder)
            .unwrap();

        assert_eq!(report.termination, Termination::InputEnded);
        assert_eq!(report.requests, 0);
        assert_eq!(output.flushes, 0);
        let (_, sent) = decoder.into_parts();
        assert!(sent.is_empty());
    }

    #[test]
    fn input_is_chunked_to_configured_size() {
        let raw = pseudo_random(45, 9);
        let bridge = Bridge::new(BridgeConfig {
            input_chunk_size: 20,
            ..BridgeConfig::default()
        });
        let mut input = Cursor::new(raw.clone());
        let mut output = Sink::default();
        let mut decoder = FramedChannel::new(
            Cursor::new(responses(&[b"a", b"b", b"c"])),
            Vec::<u8>::new(),
        );

        bridge.run(&mut input, &mut output, &mut decoder).unwrap();

        assert_eq!(output.bytes, b"abc");
        let (_, sent) = decoder.into_parts();
        let chunks = sent_frames(sent);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), raw);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn decoder_close_between_frames_is_clean() {
        let mut input = Cursor::new(vec![1u8; 30]);
        let mut output = Sink::default();
        let mut decoder = FramedChannel::new(Cursor::new(Vec::<u8>::new()), Vec::<u8>::new());

        let report = Bridge::default()
            .run(&mut input, &mut output, &mut decoder)
            .unwrap();

        assert_eq!(report.termination, Termination::DecoderClosed);
        assert!(report.termination.is_clean());
        assert!(output.bytes.is_empty());
    }

    #[test]
    fn short_prefix_is_distinguished_from_clean_close() {
        let mut input = Cursor::new(vec![1u8; 30]);
        let mut output = Sink::default();
        let mut decoder = FramedChannel::new(Cursor::new(vec![0x10, 0x00]), Vec::<u8>::new());

        let report = Bridge::default()
            .run(&mut input, &mut output, &mut decoder)
            .unwrap();

        assert_eq!(
            report.termination,
            Termination::DecoderTruncatedPrefix { received: 2 }
        );
        assert!(!report.termination.is_clean());
    }

    #[test]
    fn short_payload_ends_without_error() {
        let mut wire = BytesMut::new();
        wire.put_i32_le(100);
        wire.put_slice(&[9u8; 30]);

        let bridge = Bridge::new(BridgeConfig {
            output_chunk_size: 16,
            ..BridgeConfig::default()
        });
        let mut input = Cursor::new(vec![1u8; 30]);
        let mut output = Sink::default();
        let mut decoder = FramedChannel::new(Cursor::new(wire.to_vec()), Vec::<u8>::new());

        let report = bridge.run(&mut input, &mut output, &mut decoder).unwrap();

        // The first full 16-byte sub-chunk is delivered; the partial one is dropped.
        assert_eq!(output.bytes, vec![9u8; 16]);
        assert_eq!(output.flushes, 1);
        assert_eq!(report.frames, 0);
        assert_eq!(
            report.termination,
            Termination::DecoderTruncatedPayload {
                declared: 100,
                received: 30
            }
        );
    }

    #[test]
    fn input_error_is_fatal() {
        let mut output = Sink::default();
        let mut decoder = FramedChannel::new(Cursor::new(Vec::<u8>::new()), Vec::<u8>::new());

        let err = Bridge::default()
            .run(&mut FailingInput, &mut output, &mut decoder)
            .unwrap_err();
        assert!(matches!(err, BridgeError::InputRead(_)));
    }

    #[test]
    fn output_error_is_fatal() {
        let mut input = Cursor::new(vec![1u8; 4]);
        let mut decoder =
            FramedChannel::new(Cursor::new(responses(&[b"decoded"])), Vec::<u8>::new());

        let err = Bridge::default()
            .run(&mut input, &mut FailingOutput, &mut decoder)
            .unwrap_err();
        assert!(matches!(err, BridgeError::OutputWrite(_)));
    }

    #[test]
    fn decoder_write_error_is_fatal() {
        let mut input = Cursor::new(vec![1u8; 4]);
        let mut output = Sink::default();
        let mut decoder = FramedChannel::new(Cursor::new(Vec::<u8>::new()), FailingOutput);

        let err = Bridge::default()
            .run(&mut input, &mut output, &mut decoder)
            .unwrap_err();
        assert!(matches!(err, BridgeError::ChannelWrite(FrameError::Io(_))));
    }

    #[test]
    fn decoder_read_error_is_fatal() {
        let mut input = Cursor::new(vec![1u8; 4]);
        let mut output = Sink::default();
        let mut decoder = FramedChannel::new(FailingInput, Vec::<u8>::new());

        let err = Bridge::default()
            .run(&mut input, &mut output, &mut decoder)
            .unwrap_err();
        assert!(matches!(err, BridgeError::ChannelRead(FrameError::Io(_))));
    }

    #[test]
    fn interrupted_input_is_retried() {
        let mut input = InterruptOnce {
            fired: false,
            inner: Cursor::new(vec![5u8; 8]),
        };
        let mut output = Sink::default();
        let mut decoder =
            FramedChannel::new(Cursor::new(responses(&[b"ok"])), Vec::<u8>::new());

        let report = Bridge::default()
            .run(&mut input, &mut output, &mut decoder)
            .unwrap();
        assert_eq!(output.bytes, b"ok");
        assert_eq!(report.termination, Termination::InputEnded);
    }

    #[test]
    fn termination_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Termination::DecoderTruncatedPayload {
            declared: 8,
            received: 3,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"kind":"decoder_truncated_payload","declared":8,"received":3}"#
        );
    }

    struct FailingInput;

    impl Read for FailingInput {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::ConnectionReset))
        }
    }

    struct FailingOutput;

    impl Write for FailingOutput {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptOnce {
        fired: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.fired {
                self.fired = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
