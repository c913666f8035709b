//! Module for the "config" command.

use std::path::Path;

use super::*;

/// Function for the [`Commands::Config`] in the CLI.
///
/// Validates `path` (or `--config`, or the platform default) and prints where the configuration
/// came from on stderr and the effective file on stdout, so the output can be redirected into a
/// starting `lookup.toml`.
pub fn config(cli: &Cli, path: Option<&Path>) -> Result<()> {
  let path = path.or(cli.config.as_deref());
  let config = cli.load_config_from(path)?;
  match path {
    Some(path) => eprintln!("{} Loaded {}", style(SUCCESS_PREFIX).green(), style(path.display()).yellow()),
    None => {
      let path = LookupConfig::default_path();
      if path.exists() {
        eprintln!("{} Loaded {}", style(SUCCESS_PREFIX).green(), style(path.display()).yellow());
      } else {
        eprintln!(
          "{} No file at {}, showing built-in defaults",
          style(INFO_PREFIX).cyan(),
          style(path.display()).yellow()
        );
      }
    },
  }
  print!("{}", toml::to_string_pretty(&config)?);
  Ok(())
}
