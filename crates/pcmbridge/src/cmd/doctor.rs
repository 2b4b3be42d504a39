use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use pcmbridge_transport::{is_fifo, PipeName, UnixDomainSocket};
use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    schema_id: &'static str,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let pipe_dir = args.pipe_dir.resolve();
    let decoder = PipeName::parse(&args.decoder_pipe).resolve(&pipe_dir);

    let mut checks = vec![
        platform_transport_check(),
        pipe_dir_bind_check(&pipe_dir),
        decoder_channel_check(&decoder),
    ];
    checks.extend(args.fifo.iter().map(|path| fifo_check(path)));

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput {
        schema_id: "pcmbridge.cli.v1.doctor-report",
        checks,
        overall,
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("pcmbridge doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<18} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
    }
}

fn check(name: &str, status: CheckStatus, detail: impl Into<String>) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        status,
        detail: detail.into(),
    }
}

fn platform_transport_check() -> CheckResult {
    check(
        "platform_transport",
        CheckStatus::Info,
        format!(
            "Unix domain sockets on {}, pipe names map to {}<name>",
            std::env::consts::OS,
            pcmbridge_transport::PIPE_PREFIX
        ),
    )
}

fn pipe_dir_bind_check(pipe_dir: &Path) -> CheckResult {
    let probe = pipe_dir.join(format!(".pcmbridge-doctor-{}.sock", std::process::id()));
    match UnixDomainSocket::bind(&probe) {
        Ok(socket) => {
            drop(socket);
            check(
                "pipe_dir_bind",
                CheckStatus::Pass,
                format!("{} accepts socket binds", pipe_dir.display()),
            )
        }
        Err(err) => check(
            "pipe_dir_bind",
            CheckStatus::Fail,
            format!("{}: {err}", pipe_dir.display()),
        ),
    }
}

fn decoder_channel_check(path: &Path) -> CheckResult {
    match std::fs::metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => check(
            "decoder_channel",
            CheckStatus::Pass,
            format!("{} is listening", path.display()),
        ),
        Ok(_) => check(
            "decoder_channel",
            CheckStatus::Fail,
            format!("{} exists but is not a socket", path.display()),
        ),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => check(
            "decoder_channel",
            CheckStatus::Warn,
            format!("{} not present (is the decoder running?)", path.display()),
        ),
        Err(err) => check(
            "decoder_channel",
            CheckStatus::Fail,
            format!("{}: {err}", path.display()),
        ),
    }
}

fn fifo_check(path: &Path) -> CheckResult {
    if is_fifo(path) {
        check("fifo", CheckStatus::Pass, format!("{} is a fifo", path.display()))
    } else if path.exists() {
        check(
            "fifo",
            CheckStatus::Fail,
            format!("{} exists but is not a fifo", path.display()),
        )
    } else {
        check(
            "fifo",
            CheckStatus::Fail,
            format!("{} does not exist", path.display()),
        )
    }
}
