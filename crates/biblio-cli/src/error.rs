//! Error types for the biblio CLI.

use std::path::PathBuf;

use biblio::error::BiblioError;
use thiserror::Error;

/// Errors that end a CLI command.
#[derive(Error, Debug)]
pub enum CliError {
  /// Errors from the biblio library.
  #[error(transparent)]
  Biblio(#[from] BiblioError),

  /// The configuration file could not be read.
  #[error("cannot read configuration {path}: {source}")]
  ConfigFile {
    /// The file that was asked for.
    path:   PathBuf,
    /// The underlying failure.
    source: std::io::Error,
  },

  /// A command line argument that clap cannot check by itself.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// The lookup finished with an `ERROR` envelope.
  #[error("lookup rejected: {0}")]
  LookupRejected(String),

  /// The Internet Archive reported the file as unavailable.
  #[error("probe failed: {0}")]
  ProbeFailed(String),

  /// Errors from standard I/O operations.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// Errors writing envelopes.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// Errors rendering the configuration.
  #[error(transparent)]
  Toml(#[from] toml::ser::Error),
}

/// Type alias for Results with [`CliError`]
pub type Result<T> = core::result::Result<T, CliError>;
