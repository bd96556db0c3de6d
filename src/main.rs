use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing::info;

mod alert;
mod cli;
mod config;
mod engine;
mod error;
mod models;
mod probe;
mod store;

use crate::alert::SmtpMailer;
use crate::cli::Cli;
use crate::config::{FileConfig, MonitorConfig};
use crate::engine::Monitor;
use crate::error::ConfigError;
use crate::store::WorkbookStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file = cli.config_file.as_deref().and_then(FileConfig::load);
    let config = match MonitorConfig::resolve(&cli, file) {
        Ok(config) => config,
        Err(e) => {
            let (kind, message) = match &e {
                ConfigError::Missing(_) => (
                    ErrorKind::MissingRequiredArgument,
                    format!("{e}. Provide them via command line or a config file"),
                ),
                ConfigError::Proxy(_) => (ErrorKind::ValueValidation, e.to_string()),
            };
            Cli::command().error(kind, message).exit()
        }
    };

    let history = WorkbookStore::new(&config.log_file);
    info!(
        "Checking {} target(s) through {}, history at {}",
        config.websites.len(),
        config.proxy,
        history.path().display()
    );

    let mut monitor = Monitor::new(&config, history, SmtpMailer)?;
    let summary = monitor.run().await;

    Ok(if summary.all_up() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
