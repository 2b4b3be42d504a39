use std::io::IsTerminal;
use std::path::Path;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pcmbridge_session::{BridgeReport, Codec};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct SessionOutput<'a> {
    schema_id: &'a str,
    codec: Codec,
    output_channels: u16,
    decoder: String,
    clean: bool,
    #[serde(flatten)]
    report: &'a BridgeReport,
}

pub fn print_session_report(
    report: &BridgeReport,
    codec: Codec,
    output_channels: u16,
    decoder: &Path,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = SessionOutput {
                schema_id: "pcmbridge.cli.v1.session-report",
                codec,
                output_channels,
                decoder: decoder.display().to_string(),
                clean: report.termination.is_clean(),
                report,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "CODEC",
                    "CHANNELS",
                    "REQUESTS",
                    "FRAMES",
                    "EMPTY",
                    "BYTES IN",
                    "BYTES OUT",
                    "ENDED",
                ])
                .add_row(vec![
                    codec.to_string(),
                    output_channels.to_string(),
                    report.requests.to_string(),
                    report.frames.to_string(),
                    report.empty_responses.to_string(),
                    report.bytes_in.to_string(),
                    report.bytes_out.to_string(),
                    report.termination.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "codec={} channels={} requests={} frames={} empty={} in={} out={} ended=\"{}\"",
                codec,
                output_channels,
                report.requests,
                report.frames,
                report.empty_responses,
                report.bytes_in,
                report.bytes_out,
                report.termination
            );
        }
        OutputFormat::Raw => {
            println!("{}", report.bytes_out);
        }
    }
}

#[derive(Serialize)]
struct RelayOutput<'a> {
    schema_id: &'a str,
    direction: &'a str,
    from: String,
    to: String,
    bytes: u64,
}

pub fn print_relay_summary(direction: &str, from: &Path, to: &Path, bytes: u64, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = RelayOutput {
                schema_id: "pcmbridge.cli.v1.relay-summary",
                direction,
                from: from.display().to_string(),
                to: to.display().to_string(),
                bytes,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DIRECTION", "FROM", "TO", "BYTES"])
                .add_row(vec![
                    direction.to_string(),
                    from.display().to_string(),
                    to.display().to_string(),
                    bytes.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{direction}: {} -> {} ({bytes} bytes)",
                from.display(),
                to.display()
            );
        }
        OutputFormat::Raw => {
            println!("{bytes}");
        }
    }
}
