mod app;
mod model;
mod plugin;
mod server;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use app::Outcome;
use model::config::CONFIG_FILE;

fn main() -> Result<ExitCode> {
    let _guard = init_logging()?;

    tracing::info!("server-tester starting");

    match app::run(Path::new(CONFIG_FILE)) {
        Ok(Outcome::ConfigCreated(path)) => {
            tracing::info!(
                "created default settings at {}; edit them and run again",
                path.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Ok(Outcome::ServerExited(exit)) => {
            match exit.code() {
                Some(code) => tracing::info!("server exited with exit code: {code}"),
                None => tracing::warn!("server was terminated by a signal"),
            }
            Ok(exit.exit_code())
        }
        Err(e) => {
            tracing::error!("{e:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Log to stderr for the operator and to a daily file; stdout belongs to the server.
fn init_logging() -> Result<WorkerGuard> {
    let log_dir = directories::ProjectDirs::from("", "", "server-tester")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "server-tester.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("server_tester=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}
