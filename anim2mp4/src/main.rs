use std::process::ExitCode;

use anyhow::Context;
use console::style;
use tracing::info;

use anim2mp4::cli::report_failure;
use anim2mp4::{Cli, ConversionPath, Converter};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::SystemRunner;

fn main() -> ExitCode {
    let cli = Cli::parse_normalized();

    let Some(request) = cli.to_request() else {
        eprintln!("{}", anim2mp4::cli::usage());
        return ExitCode::FAILURE;
    };

    if let Err(e) = init_logging("anim2mp4", LogConfig::default().verbose(request.verbose)) {
        eprintln!("⚠️  Could not initialize logging: {:#}", e);
    }

    let tools = match shared_utils::preflight() {
        Ok(tools) => tools,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{}", hint);
            }
            return ExitCode::FAILURE;
        }
    };

    let converter = Converter::new(SystemRunner::new(request.verbose), tools);
    let result = converter
        .convert(&request)
        .with_context(|| format!("failed to convert {}", request.input.display()));

    match result {
        Ok(converted) => {
            let via = match converted.path {
                ConversionPath::Direct => "direct",
                ConversionPath::Extraction => "frame extraction",
            };
            info!(
                path = via,
                recovered = converted.direct_error.is_some(),
                "Conversion finished"
            );
            println!(
                "{} {} to {}",
                style("Successfully converted").green().bold(),
                request.input.display(),
                request.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), report_failure(&e));
            ExitCode::FAILURE
        }
    }
}
