use std::path::Path;

use pcmbridge_transport::{create_fifo, DEFAULT_FIFO_MODE};

use crate::cmd::{resolve_pipe, FifoToPipeArgs, PipeToFifoArgs};
use crate::exit::{relay_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_relay_summary, OutputFormat};

pub fn fifo_to_pipe(args: FifoToPipeArgs, format: OutputFormat) -> CliResult<i32> {
    let retry = args.retry.policy()?;
    let pipe = resolve_pipe(&args.pipe, &args.pipe_dir);
    ensure_fifo(&args.fifo, args.create_fifo)?;

    let bytes = pcmbridge_session::fifo_to_pipe(&args.fifo, &pipe, &retry)
        .map_err(|err| relay_error("fifo-to-pipe failed", err))?;

    print_relay_summary("fifo-to-pipe", &args.fifo, &pipe, bytes, format);
    Ok(SUCCESS)
}

pub fn pipe_to_fifo(args: PipeToFifoArgs, format: OutputFormat) -> CliResult<i32> {
    let retry = args.retry.policy()?;
    let pipe = resolve_pipe(&args.pipe, &args.pipe_dir);
    ensure_fifo(&args.fifo, args.create_fifo)?;

    let bytes = pcmbridge_session::pipe_to_fifo(&pipe, &args.fifo, &retry)
        .map_err(|err| relay_error("pipe-to-fifo failed", err))?;

    print_relay_summary("pipe-to-fifo", &pipe, &args.fifo, bytes, format);
    Ok(SUCCESS)
}

fn ensure_fifo(path: &Path, create: bool) -> CliResult<()> {
    if create {
        create_fifo(path, DEFAULT_FIFO_MODE)
            .map_err(|err| transport_error("cannot create fifo", err))?;
    }
    Ok(())
}
