mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "pcmbridge",
    version,
    about = "Bridge raw PCM between local pipes and a framed decoder channel"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_positional_compat() {
        let cli = Cli::try_parse_from(["pcmbridge", "run", "6", "eac3"])
            .expect("run args should parse");

        match cli.command {
            Command::Run(args) => assert_eq!(args.positional, vec!["6", "eac3"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_three_positionals() {
        let result = Cli::try_parse_from(["pcmbridge", "run", "6", "eac3", "extra"]);

        assert!(result.is_err(), "a third positional should fail");
    }

    #[test]
    fn parses_relay_subcommands() {
        let cli = Cli::try_parse_from([
            "pcmbridge",
            "fifo-to-pipe",
            "/tmp/in.fifo",
            "--create-fifo",
            "--connect-attempts",
            "3",
        ])
        .expect("fifo-to-pipe args should parse");
        assert!(matches!(cli.command, Command::FifoToPipe(_)));

        let err = Cli::try_parse_from(["pcmbridge", "pipe-to-fifo"])
            .expect_err("pipe-to-fifo needs a fifo path");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
