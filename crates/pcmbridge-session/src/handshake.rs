use std::fmt;
use std::io::Write;
use std::str::FromStr;

use pcmbridge_frame::FrameWriter;
use serde::Serialize;
use tracing::info;

use crate::error::HandshakeError;

/// Size of the handshake record on the wire.
pub const HANDSHAKE_SIZE: usize = 8;

/// PCM sample depth sent to the decoder. 16-bit is the only depth supported.
pub const PCM_BIT_DEPTH: u8 = 16;

/// Codecs the decoder service can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Eac3,
    Ac3,
    TrueHd,
}

/// Per-codec timing parameters carried in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecProfile {
    /// Frames the decoder must buffer before it emits output.
    pub mandatory_frames: u8,
    /// Decoder update rate in samples.
    pub update_rate: i32,
}

impl Codec {
    /// Resolve a codec identifier, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Result<Self, HandshakeError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "eac3" => Ok(Self::Eac3),
            "ac3" => Ok(Self::Ac3),
            "truehd" => Ok(Self::TrueHd),
            _ => Err(HandshakeError::UnsupportedCodec(value.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eac3 => "eac3",
            Self::Ac3 => "ac3",
            Self::TrueHd => "truehd",
        }
    }

    pub fn profile(self) -> CodecProfile {
        match self {
            Self::Eac3 | Self::Ac3 => CodecProfile {
                mandatory_frames: 24,
                update_rate: 64,
            },
            Self::TrueHd => CodecProfile {
                mandatory_frames: 0,
                update_rate: 0,
            },
        }
    }
}

impl FromStr for Codec {
    type Err = HandshakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one-time format record sent before any audio.
///
/// ```text
/// ┌──────────┬───────────┬──────────────┬──────────────┐
/// │ bit depth│ mandatory │ out channels │ update rate  │
/// │ (u8)     │ frames u8 │ (u16 LE)     │ (i32 LE)     │
/// └──────────┴───────────┴──────────────┴──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeRecord {
    pub bit_depth: u8,
    pub mandatory_frames: u8,
    pub output_channels: u16,
    pub update_rate: i32,
}

impl HandshakeRecord {
    pub fn new(codec: Codec, output_channels: u16) -> Self {
        let profile = codec.profile();
        Self {
            bit_depth: PCM_BIT_DEPTH,
            mandatory_frames: profile.mandatory_frames,
            output_channels,
            update_rate: profile.update_rate,
        }
    }

    pub fn to_bytes(&self) -> [u8; HANDSHAKE_SIZE] {
        let mut out = [0u8; HANDSHAKE_SIZE];
        out[0] = self.bit_depth;
        out[1] = self.mandatory_frames;
        out[2..4].copy_from_slice(&self.output_channels.to_le_bytes());
        out[4..8].copy_from_slice(&self.update_rate.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: [u8; HANDSHAKE_SIZE]) -> Self {
        Self {
            bit_depth: bytes[0],
            mandatory_frames: bytes[1],
            output_channels: u16::from_le_bytes([bytes[2], bytes[3]]),
            update_rate: i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

/// Send the handshake for `codec` and `output_channels` to the decoder.
///
/// The codec is resolved before anything is written, so an unknown codec
/// leaves the channel untouched. The record goes out as a single write plus
/// flush; any failure there ends the session.
pub fn negotiate<W: Write>(
    writer: &mut FrameWriter<W>,
    output_channels: u16,
    codec: &str,
) -> Result<HandshakeRecord, HandshakeError> {
    let codec = Codec::parse(codec)?;
    let record = HandshakeRecord::new(codec, output_channels);
    let bytes = record.to_bytes();

    info!(
        bytes = %hex(&bytes),
        %codec,
        output_channels,
        "sending handshake"
    );

    writer
        .write_record(&bytes)
        .map_err(HandshakeError::ChannelWrite)?;
    Ok(record)
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, ErrorKind};

    use pcmbridge_frame::FrameError;

    use super::*;

    fn sent(codec: &str, channels: u16) -> Result<Vec<u8>, HandshakeError> {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        negotiate(&mut writer, channels, codec)?;
        Ok(writer.into_inner().into_inner())
    }

    #[test]
    fn eac3_six_channels_matches_reference_bytes() {
        assert_eq!(
            sent("eac3", 6).unwrap(),
            vec![0x10, 0x18, 0x06, 0x00, 0x40, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn timing_fields_follow_profile_for_any_case() {
        for (codec, frames, rate) in [
            ("eac3", 24, 64),
            ("EAC3", 24, 64),
            ("eAc3", 24, 64),
            ("ac3", 24, 64),
            ("AC3", 24, 64),
            ("truehd", 0, 0),
            ("TrueHD", 0, 0),
            ("TRUEHD", 0, 0),
        ] {
            let bytes = sent(codec, 2).unwrap();
            let record = HandshakeRecord::from_bytes(bytes.try_into().unwrap());
            assert_eq!(record.bit_depth, PCM_BIT_DEPTH, "{codec}");
            assert_eq!(record.mandatory_frames, frames, "{codec}");
            assert_eq!(record.update_rate, rate, "{codec}");
        }
    }

    #[test]
    fn unknown_codec_writes_nothing() {
        for codec in ["", "dts", "pcm", "eac-3", "ac4", "truehd2"] {
            let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
            let err = negotiate(&mut writer, 2, codec).unwrap_err();
            assert!(matches!(err, HandshakeError::UnsupportedCodec(_)), "{codec}");
            assert!(writer.get_ref().get_ref().is_empty(), "{codec}");
        }
    }

    #[test]
    fn channel_count_is_little_endian_across_range() {
        for channels in 0..=u16::MAX {
            let bytes = HandshakeRecord::new(Codec::TrueHd, channels).to_bytes();
            assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), channels);
            assert_eq!(&bytes[2..4], &channels.to_le_bytes());
        }
    }

    #[test]
    fn flush_failure_is_channel_write_error() {
        let mut writer = FrameWriter::new(BrokenFlush);
        let err = negotiate(&mut writer, 2, "ac3").unwrap_err();
        assert!(matches!(
            err,
            HandshakeError::ChannelWrite(FrameError::Io(ref e)) if e.kind() == ErrorKind::BrokenPipe
        ));
    }

    #[test]
    fn codec_parse_trims_and_displays_canonical_name() {
        assert_eq!(" TrueHD ".parse::<Codec>().unwrap(), Codec::TrueHd);
        assert_eq!(Codec::Ac3.to_string(), "ac3");
    }

    struct BrokenFlush;

    impl Write for BrokenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }
}
