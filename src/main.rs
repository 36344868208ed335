//! cpv - preview an object from a data catalog

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use catalog_preview::app::{exit_code, run, Config};

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the preview
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse config first to return INVALID exit code for argument errors
    let config = match Config::from_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(exit_code::INVALID as u8);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(exit_code::ERROR as u8);
        }
    };

    match runtime.block_on(run(config)) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_code::ERROR as u8)
        }
    }
}
