use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use pcmbridge_session::{DEFAULT_DECODER_PIPE, DEFAULT_INPUT_PIPE, DEFAULT_OUTPUT_PIPE};
use pcmbridge_transport::{default_pipe_dir, PipeName, RetryPolicy};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod doctor;
pub mod relay;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bridge the raw endpoints to the decoder until either side ends.
    Run(RunArgs),
    /// Copy an upstream FIFO into the raw input endpoint.
    FifoToPipe(FifoToPipeArgs),
    /// Copy the raw output endpoint into a downstream FIFO.
    PipeToFifo(PipeToFifoArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::FifoToPipe(args) => relay::fifo_to_pipe(args, format),
        Command::PipeToFifo(args) => relay::pipe_to_fifo(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PipeDirArgs {
    /// Directory bare pipe names resolve under. Default: the system temp dir.
    #[arg(long, value_name = "DIR", env = "PCMBRIDGE_PIPE_DIR")]
    pub pipe_dir: Option<PathBuf>,
}

impl PipeDirArgs {
    pub fn resolve(&self) -> PathBuf {
        self.pipe_dir.clone().unwrap_or_else(default_pipe_dir)
    }
}

#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Connect attempts before giving up.
    #[arg(long, value_name = "N", default_value = "20")]
    pub connect_attempts: u32,
    /// Time allotted to each connect attempt (e.g. 500ms, 1s).
    #[arg(long, value_name = "DURATION", default_value = "500ms")]
    pub connect_timeout: String,
}

impl RetryArgs {
    pub fn policy(&self) -> CliResult<RetryPolicy> {
        if self.connect_attempts == 0 {
            return Err(CliError::new(USAGE, "--connect-attempts must be at least 1"));
        }
        Ok(RetryPolicy {
            attempts: self.connect_attempts,
            attempt_timeout: parse_duration(&self.connect_timeout)?,
        })
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Compatibility form: `[<out_channels>] [<codec>]`, or `<codec>` alone.
    #[arg(value_name = "ARGS", num_args = 0..=2)]
    pub positional: Vec<String>,
    /// Codec identifier: eac3, ac3 or truehd (case-insensitive).
    #[arg(long, env = "PCMBRIDGE_CODEC")]
    pub codec: Option<String>,
    /// Output channel count requested from the decoder.
    #[arg(long, value_name = "N", env = "PCMBRIDGE_OUT_CHANNELS")]
    pub out_channels: Option<u16>,
    #[command(flatten)]
    pub pipe_dir: PipeDirArgs,
    /// Raw input endpoint name or path.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_INPUT_PIPE)]
    pub input_pipe: String,
    /// Raw output endpoint name or path.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_OUTPUT_PIPE)]
    pub output_pipe: String,
    /// Decoder channel name or path.
    #[arg(
        long,
        value_name = "NAME",
        default_value = DEFAULT_DECODER_PIPE,
        env = "PCMBRIDGE_DECODER_PIPE"
    )]
    pub decoder_pipe: String,
    #[command(flatten)]
    pub retry: RetryArgs,
    /// Largest raw chunk forwarded per request.
    #[arg(long, value_name = "BYTES", default_value = "20000")]
    pub input_chunk_size: usize,
    /// Largest sub-chunk read from a decoder response.
    #[arg(long, value_name = "BYTES", default_value = "65536")]
    pub output_chunk_size: usize,
    /// Log a progress line every N responses (0 disables).
    #[arg(long, value_name = "N", default_value = "100")]
    pub progress_interval: u64,
    /// Fail when the decoder closes the channel mid-frame.
    #[arg(long)]
    pub strict_decoder_close: bool,
}

#[derive(Args, Debug)]
pub struct FifoToPipeArgs {
    /// FIFO to read raw PCM from.
    #[arg(default_value = "/tmp/snapcast-in")]
    pub fifo: PathBuf,
    /// Raw input endpoint name or path.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_INPUT_PIPE)]
    pub pipe: String,
    #[command(flatten)]
    pub pipe_dir: PipeDirArgs,
    /// Create the FIFO if it does not exist.
    #[arg(long)]
    pub create_fifo: bool,
    #[command(flatten)]
    pub retry: RetryArgs,
}

#[derive(Args, Debug)]
pub struct PipeToFifoArgs {
    /// FIFO to write decoded bytes to.
    pub fifo: PathBuf,
    /// Raw output endpoint name or path.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_OUTPUT_PIPE)]
    pub pipe: String,
    #[command(flatten)]
    pub pipe_dir: PipeDirArgs,
    /// Create the FIFO if it does not exist.
    #[arg(long)]
    pub create_fifo: bool,
    #[command(flatten)]
    pub retry: RetryArgs,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub pipe_dir: PipeDirArgs,
    /// Decoder channel name or path to look for.
    #[arg(
        long,
        value_name = "NAME",
        default_value = DEFAULT_DECODER_PIPE,
        env = "PCMBRIDGE_DECODER_PIPE"
    )]
    pub decoder_pipe: String,
    /// FIFO paths that should exist (repeatable).
    #[arg(long, value_name = "PATH")]
    pub fifo: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn resolve_pipe(name: &str, pipe_dir: &PipeDirArgs) -> PathBuf {
    PipeName::parse(name).resolve(&pipe_dir.resolve())
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
