use pcmbridge_session::{BridgeConfig, Session, SessionConfig};
use pcmbridge_transport::PipeName;
use tracing::info;

use crate::cmd::RunArgs;
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_session_report, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(&args)?;
    // Rejects an unknown codec before any endpoint is bound or connected.
    let session = Session::new(config).map_err(|err| session_error("invalid session", err))?;
    let config = session.config();
    info!(
        codec = %session.codec(),
        output_channels = config.output_channels,
        input = ?config.input_path(),
        output = ?config.output_path(),
        decoder = ?config.decoder_path(),
        "starting session"
    );

    let report = session
        .run()
        .map_err(|err| session_error("session failed", err))?;

    print_session_report(
        &report,
        session.codec(),
        config.output_channels,
        &config.decoder_path(),
        format,
    );
    Ok(SUCCESS)
}

fn session_config(args: &RunArgs) -> CliResult<SessionConfig> {
    let (positional_channels, positional_codec) = split_positional(&args.positional)?;
    let defaults = SessionConfig::default();

    Ok(SessionConfig {
        pipe_dir: args.pipe_dir.resolve(),
        input_pipe: PipeName::parse(&args.input_pipe),
        output_pipe: PipeName::parse(&args.output_pipe),
        decoder_pipe: PipeName::parse(&args.decoder_pipe),
        output_channels: positional_channels
            .or(args.out_channels)
            .unwrap_or(defaults.output_channels),
        codec: positional_codec
            .or_else(|| args.codec.clone())
            .unwrap_or(defaults.codec),
        bridge: BridgeConfig {
            input_chunk_size: args.input_chunk_size,
            output_chunk_size: args.output_chunk_size,
            progress_interval: args.progress_interval,
        },
        decoder_retry: args.retry.policy()?,
        strict_decoder_close: args.strict_decoder_close,
    })
}

/// `<codec>` alone, or `<out_channels> <codec>`.
fn split_positional(values: &[String]) -> CliResult<(Option<u16>, Option<String>)> {
    match values {
        [] => Ok((None, None)),
        [codec] => Ok((None, Some(codec.clone()))),
        [channels, codec] => {
            let channels = channels.trim().parse::<u16>().map_err(|_| {
                CliError::new(
                    USAGE,
                    format!("invalid output channel count '{channels}' (expected 0-65535)"),
                )
            })?;
            Ok((Some(channels), Some(codec.clone())))
        }
        _ => Err(CliError::new(
            USAGE,
            "expected at most two positional arguments: [<out_channels>] [<codec>]",
        )),
    }
}
