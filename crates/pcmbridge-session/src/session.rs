use std::io::{Read, Write};
use std::path::PathBuf;

use pcmbridge_frame::{FrameConfig, FramedChannel};
use pcmbridge_transport::{default_pipe_dir, PipeName, RetryPolicy};
use tracing::{info, warn};

use crate::bridge::{Bridge, BridgeConfig, BridgeReport};
use crate::connector::connect_decoder;
use crate::error::{Result, SessionError};
use crate::handshake::{negotiate, Codec};
use crate::listener::RawEndpoints;

/// Well-known name of the raw input endpoint.
pub const DEFAULT_INPUT_PIPE: &str = "cavern-audio-input";
/// Well-known name of the raw output endpoint.
pub const DEFAULT_OUTPUT_PIPE: &str = "cavern-audio-output";
/// Well-known name of the decoder service channel.
pub const DEFAULT_DECODER_PIPE: &str = "CavernPipe";

/// Everything one bridging run needs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory bare channel names resolve under.
    pub pipe_dir: PathBuf,
    pub input_pipe: PipeName,
    pub output_pipe: PipeName,
    pub decoder_pipe: PipeName,
    /// Channel count the decoder should produce.
    pub output_channels: u16,
    /// Codec identifier, e.g. `eac3`.
    pub codec: String,
    pub bridge: BridgeConfig,
    /// Retry budget for the decoder connection.
    pub decoder_retry: RetryPolicy,
    /// Fail the session when the decoder closes mid-frame instead of
    /// treating it like a clean close.
    pub strict_decoder_close: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pipe_dir: default_pipe_dir(),
            input_pipe: PipeName::parse(DEFAULT_INPUT_PIPE),
            output_pipe: PipeName::parse(DEFAULT_OUTPUT_PIPE),
            decoder_pipe: PipeName::parse(DEFAULT_DECODER_PIPE),
            output_channels: 2,
            codec: "eac3".to_string(),
            bridge: BridgeConfig::default(),
            decoder_retry: RetryPolicy::default(),
            strict_decoder_close: false,
        }
    }
}

impl SessionConfig {
    /// Check the configuration without touching any endpoint.
    pub fn validate(&self) -> Result<Codec> {
        let codec = Codec::parse(&self.codec)?;
        if self.bridge.input_chunk_size == 0 {
            return Err(SessionError::InvalidConfig(
                "input chunk size must be positive".to_string(),
            ));
        }
        if self.bridge.output_chunk_size == 0 {
            return Err(SessionError::InvalidConfig(
                "output chunk size must be positive".to_string(),
            ));
        }
        Ok(codec)
    }

    pub fn input_path(&self) -> PathBuf {
        self.input_pipe.resolve(&self.pipe_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_pipe.resolve(&self.pipe_dir)
    }

    pub fn decoder_path(&self) -> PathBuf {
        self.decoder_pipe.resolve(&self.pipe_dir)
    }
}

/// One bridging run.
///
/// A session owns its raw streams and decoder channel for its whole lifetime
/// and shares nothing with other sessions.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    codec: Codec,
}

impl Session {
    /// Validate `config` and prepare a session. No I/O happens here.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let codec = config.validate()?;
        Ok(Self { config, codec })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Bind the raw endpoints, wait for both clients, then bridge.
    pub fn run(&self) -> Result<BridgeReport> {
        let endpoints =
            RawEndpoints::bind(self.config.input_path(), self.config.output_path())?;
        let (input, output) = endpoints.wait_for_clients()?;
        self.run_with(input, output)
    }

    /// Bridge already-connected raw streams.
    ///
    /// Connecting to the decoder, the handshake and the streaming loop run on
    /// a dedicated worker thread. Nothing is read from `input` until the
    /// handshake has been sent.
    pub fn run_with<I, O>(&self, input: I, output: O) -> Result<BridgeReport>
    where
        I: Read + Send,
        O: Write + Send,
    {
        let worker = std::thread::Builder::new().name("pcmbridge-pump".to_string());
        let report = std::thread::scope(|scope| {
            let handle = worker
                .spawn_scoped(scope, move || self.pump(input, output))
                .map_err(pcmbridge_transport::TransportError::Io)?;
            handle.join().map_err(|_| SessionError::WorkerPanicked)?
        })?;

        if !report.termination.is_clean() {
            if self.config.strict_decoder_close {
                return Err(SessionError::DecoderTruncated(report.termination));
            }
            warn!(termination = %report.termination, "decoder closed mid-frame");
        }
        Ok(report)
    }

    fn pump<I: Read, O: Write>(&self, mut input: I, mut output: O) -> Result<BridgeReport> {
        let stream = connect_decoder(self.config.decoder_path(), &self.config.decoder_retry)?;
        let mut channel = FramedChannel::from_stream(stream, FrameConfig::default())?;

        negotiate(
            channel.writer_mut(),
            self.config.output_channels,
            self.codec.as_str(),
        )?;

        let report =
            Bridge::new(self.config.bridge.clone()).run(&mut input, &mut output, &mut channel)?;
        info!(
            frames = report.frames,
            bytes_out = report.bytes_out,
            "session finished"
        );
        Ok(report)
    }
}
