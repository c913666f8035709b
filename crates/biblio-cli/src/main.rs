//! Command line driver for the `biblio` lookup layer.
//!
//! Runs lookups against the configured providers and prints the envelope stream as
//! newline-delimited JSON, one envelope per line, exactly as a channel client would receive it.
//! It also probes and downloads Internet Archive derivatives and streams BiblioVault objects out
//! of S3.
//!
//! # Usage
//!
//! ```bash
//! # Search every enabled provider
//! biblio lookup "author:Melville" "title:Moby Dick"
//!
//! # Ask one provider, with a tighter timeout
//! biblio lookup isbn:0142437247 --service crossref --timeout 3
//!
//! # Show the resolved provider settings
//! biblio services
//!
//! # Download an on-the-fly derivative
//! biblio download https://archive.org/download/mobydick/mobydick.epub --out books/
//! ```
//!
//! Logs go to stderr (or to daily-rotated files under `--log-dir`) so stdout carries only
//! envelopes. Use `-v` flags or `RUST_LOG` to raise the log level.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use biblio::{configuration::LookupConfig, error::BiblioError};
use clap::{builder::ArgAction, Parser};
use console::style;
use tracing::{debug, trace};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub mod commands;
pub mod error;

use crate::{commands::*, error::*};

/// Prefix for information messages
static INFO_PREFIX: &str = "ℹ ";
/// Prefix for success messages
static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for warning messages
static WARNING_PREFIX: &str = "⚠️ ";
/// Prefix for error messages
static ERROR_PREFIX: &str = "✗ ";
/// Branch character for tree structure
static TREE_BRANCH: &str = "├";
/// Leaf character for tree structure (end of branch)
static TREE_LEAF: &str = "└";

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Multi-provider bibliographic lookup")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(short, long, action = ArgAction::Count, global = true, help = "Increase logging verbosity")]
  verbose: u8,

  /// Path to the lookup configuration file. Defaults to `lookup.toml` in the platform config
  /// directory; built-in defaults apply when it does not exist.
  #[arg(long, short, global = true, env = "BIBLIO_CONFIG")]
  config: Option<PathBuf>,

  /// Write logs to daily-rotated files in this directory instead of stderr.
  #[arg(long, global = true, env = "BIBLIO_LOG_DIR")]
  log_dir: Option<PathBuf>,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,
}

impl Cli {
  /// Loads the configuration named by `--config`, or the default one.
  fn load_config(&self) -> Result<LookupConfig> { self.load_config_from(self.config.as_deref()) }

  /// Loads `path`, or the default configuration when `None`.
  fn load_config_from(&self, path: Option<&Path>) -> Result<LookupConfig> {
    let config = match path {
      Some(path) => LookupConfig::from_file(path).map_err(|error| match error {
        BiblioError::Io(source) => CliError::ConfigFile { path: path.to_path_buf(), source },
        other => CliError::Biblio(other),
      })?,
      None => LookupConfig::load_default()?,
    };
    trace!(?config, "Resolved configuration");
    Ok(config)
  }
}

/// Configures the logging system based on the verbosity level
///
/// The verbosity levels are:
/// - 0: error (default)
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
///
/// `RUST_LOG` overrides the level. The returned guard must live until exit so buffered file logs
/// are flushed.
fn setup_logging(verbosity: u8, log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true);

  match log_dir {
    Some(dir) => {
      let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "biblio.log"));
      builder.with_ansi(false).with_writer(writer).init();
      Some(guard)
    },
    None => {
      builder.with_writer(std::io::stderr).init();
      None
    },
  }
}

/// Entry point for the biblio CLI application
///
/// Parses arguments, sets up logging and runs the requested command. Any error is printed to
/// stderr and turns into a non-zero exit status.
#[tokio::main]
async fn main() {
  let cli = Cli::parse();
  let _guard = setup_logging(cli.verbose, cli.log_dir.as_ref());
  debug!(command = ?cli.command, "Starting biblio");

  let result = match &cli.command {
    Commands::Lookup(options) => lookup(&cli, options).await,
    Commands::Services => services(&cli),
    Commands::Config { path } => config(&cli, path.as_deref()),
    Commands::Probe { url } => probe(&cli, url).await,
    Commands::Download { url, out } => download(&cli, url, out).await,
    Commands::Fetch { item_path, out } => fetch(&cli, item_path, out).await,
  };

  if let Err(error) = result {
    eprintln!("{} {}", style(ERROR_PREFIX).red(), style(&error).red());
    std::process::exit(1);
  }
}
