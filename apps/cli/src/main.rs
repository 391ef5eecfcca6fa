//! `krs` - Keycloak / RabbitMQ admin services
//!
//! Results are printed to stdout as JSON; logs go to stderr and to a daily
//! log file.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod commands;

use commands::Command;

#[derive(Parser)]
#[command(name = "krs")]
#[command(about = "Keycloak admin event listener and administration tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Get the application data directory
fn get_app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("krs")
}

fn get_logs_dir() -> PathBuf {
    get_app_data_dir().join("logs")
}

/// Initialize tracing with console and file logging
///
/// - Console: compact, on stderr
/// - File: daily rotation in ~/.local/share/krs/logs/ (Linux)
///
/// Returns the file writer guard, which must live until exit. Logging falls
/// back to console only if the log directory can't be used.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    dotenvy::dotenv().ok();

    let logs_dir = get_logs_dir();
    if let Err(e) = std::fs::create_dir_all(&logs_dir) {
        eprintln!("Warning: Failed to create logs directory: {}", e);
    }

    // Creates files like: krs.2026-01-22.log
    let file_writer = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("krs")
        .filename_suffix("log")
        .build(&logs_dir)
    {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(e) => {
            eprintln!("Warning: Failed to create log file appender: {}", e);
            None
        }
    };

    // RUST_LOG takes precedence
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,krs_core=debug,krs_keycloak=debug,krs_amqp=debug,krs=debug,lapin=warn")
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let (file_layer, guard) = match file_writer {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    let _guard = init_tracing();
    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command).await {
        error!(error = %e, "[krs] Command failed");
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
