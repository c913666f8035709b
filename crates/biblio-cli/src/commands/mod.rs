use super::*;

pub mod config;
pub mod download;
pub mod lookup;
pub mod services;

pub use config::config;
pub use download::{download, fetch, probe};
pub use lookup::{lookup, LookupArgs};
pub use services::services;

/// Available commands for the CLI
#[derive(clap::Subcommand, Clone, Debug)]
pub enum Commands {
  /// Search the configured providers and print the envelope stream as NDJSON
  Lookup(LookupArgs),

  /// List every known service with its resolved settings
  Services,

  /// Validate a configuration file and print it, resolved, as TOML
  Config {
    /// File to check; defaults to `--config` or the platform default
    path: Option<PathBuf>,
  },

  /// Ask the Internet Archive whether an on-the-fly download is ready
  Probe {
    /// Download URL, absolute or relative to the Archive base URL
    /// Example: "/download/mobydick/mobydick.epub"
    url: String,
  },

  /// Download an Internet Archive file once it is ready
  Download {
    /// Download URL, absolute or relative to the Archive base URL
    url: String,

    /// Directory to write into
    #[arg(long, short, default_value = ".")]
    out: PathBuf,
  },

  /// Stream a BiblioVault object out of S3
  Fetch {
    /// Item path: `s3://bucket/key`, an S3 URL, `bucket/key` or a key in the default bucket
    item_path: String,

    /// Directory to write into
    #[arg(long, short, default_value = ".")]
    out: PathBuf,
  },
}
