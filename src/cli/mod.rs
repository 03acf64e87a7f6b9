//! Command-line interface
//!
//! Two commands: `init` writes a default config file, `serve` runs the
//! HTTP server. All tenant operations go through the HTTP API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::api::{self, ServerError};
use crate::config::ServerConfig;

const DEFAULT_CONFIG: &str = "univault.json";

#[derive(Debug, Parser)]
#[command(name = "univault")]
#[command(about = "Per-tenant schema lifecycle: backups, staged restores, promotion, reconciliation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a default configuration file
    Init {
        /// Config file path
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
    /// Run the HTTP server
    Serve {
        /// Config file path; missing file means defaults
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config error at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to overwrite existing config: {0}")]
    ConfigExists(PathBuf),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Parse arguments and run the selected command.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Init { config } => init(config),
        Command::Serve { config } => serve(config),
    }
}

fn init(path: PathBuf) -> Result<(), CliError> {
    if path.exists() {
        return Err(CliError::ConfigExists(path));
    }

    ServerConfig::default()
        .save(&path)
        .map_err(|source| CliError::Config { path: path.clone(), source })?;

    println!("wrote {}", path.display());
    Ok(())
}

fn serve(path: PathBuf) -> Result<(), CliError> {
    let config = ServerConfig::load(&path).map_err(|source| CliError::Config {
        path: path.clone(),
        source,
    })?;

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::from_io)?;
    runtime.block_on(api::serve(config))?;
    Ok(())
}

impl CliError {
    fn from_io(source: std::io::Error) -> Self {
        CliError::Server(ServerError::Io(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_default_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("univault.json");

        init(path.clone()).unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 8484);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("univault.json");
        std::fs::write(&path, "{}").unwrap();

        assert!(matches!(
            init(path),
            Err(CliError::ConfigExists(_))
        ));
    }

    #[test]
    fn test_cli_parses_serve() {
        let cli = Cli::try_parse_from(["univault", "serve", "--config", "custom.json"]).unwrap();
        match cli.command {
            Command::Serve { config } => assert_eq!(config, PathBuf::from("custom.json")),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["univault", "compact"]).is_err());
    }
}
