//! Module for the "lookup" command.

use std::{io::Write, time::Duration};

use biblio::{
  channel::Status,
  configuration::{wait_seconds, MAX_WAIT},
  lookup::{LookupJob, LookupOptions, LookupRequest, LookupService},
};
use serde_json::Value as JsonValue;

use super::*;

/// Arguments of [`Commands::Lookup`].
#[derive(clap::Args, Clone, Debug)]
pub struct LookupArgs {
  /// Search terms, optionally prefixed: `author:Melville`, `title:"Moby Dick"`, `isbn:...`
  #[arg(required = true)]
  pub terms: Vec<String>,

  /// Only query this service (repeatable)
  #[arg(long = "service", short = 's')]
  pub services: Vec<String>,

  /// Per-provider timeout in seconds
  #[arg(long)]
  pub timeout: Option<f64>,

  /// Overall deadline in seconds
  #[arg(long)]
  pub deadline: Option<f64>,

  /// Requesting user, echoed on every envelope
  #[arg(long)]
  pub user: Option<String>,

  /// Provider option as `name=value` (repeatable), e.g. `limit=5` or `select=["doi","title"]`
  #[arg(long = "param", short = 'p')]
  pub params: Vec<String>,
}

/// Parses a positive number of seconds, at most [`MAX_WAIT`].
fn seconds(what: &str, value: Option<f64>) -> Result<Option<Duration>> {
  match value {
    None => Ok(None),
    Some(seconds) => wait_seconds(seconds).map(Some).ok_or_else(|| {
      CliError::InvalidArgument(format!(
        "--{what} must be positive and at most {} seconds, got {seconds}",
        MAX_WAIT.as_secs()
      ))
    }),
  }
}

/// Splits `name=value`; the value is read as JSON when it parses, else kept as text.
fn param(raw: &str) -> Result<(String, JsonValue)> {
  let (name, value) = raw
    .split_once('=')
    .filter(|(name, _)| !name.trim().is_empty())
    .ok_or_else(|| CliError::InvalidArgument(format!("--param expects name=value, got '{raw}'")))?;
  let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()));
  Ok((name.trim().to_string(), value))
}

impl LookupArgs {
  /// Builds the library request.
  fn request(&self) -> Result<LookupRequest> {
    let options = LookupOptions {
      services: (!self.services.is_empty()).then(|| self.services.clone()),
      timeout:  seconds("timeout", self.timeout)?,
      deadline: seconds("deadline", self.deadline)?,
      user:     self.user.clone(),
      params:   self.params.iter().map(|raw| param(raw)).collect::<Result<_>>()?,
    };
    Ok(LookupRequest::from_terms(&self.terms)?.with_options(options))
  }
}

/// Function for the [`Commands::Lookup`] in the CLI.
pub async fn lookup(cli: &Cli, args: &LookupArgs) -> Result<()> {
  let config = cli.load_config()?;
  let request = args.request()?;
  let service = LookupService::from_config(config)?;

  let (job_id, mut receiver) = LookupJob::submit(service, request);
  debug!(job = %job_id, "Lookup submitted");

  let stdout = std::io::stdout();
  let mut rejected = None;
  while let Some(envelope) = receiver.recv().await {
    {
      let mut out = stdout.lock();
      serde_json::to_writer(&mut out, &envelope)?;
      writeln!(out)?;
    }
    match envelope.status {
      Status::Complete => {
        let summary = envelope.data.as_ref().and_then(|data| data.get("providers")).and_then(JsonValue::as_array);
        for (index, provider) in summary.into_iter().flatten().enumerate() {
          let branch = if index + 1 == summary.map_or(0, Vec::len) { TREE_LEAF } else { TREE_BRANCH };
          let name = provider["service"].as_str().unwrap_or_default();
          match provider["state"].as_str() {
            Some("COMPLETED") => eprintln!(
              "{branch} {} {} ({} items)",
              style(SUCCESS_PREFIX).green(),
              style(name).cyan(),
              provider["items"].as_array().map_or(0, Vec::len)
            ),
            _ => eprintln!(
              "{branch} {} {} {}",
              style(WARNING_PREFIX).yellow(),
              style(name).cyan(),
              style(provider["reason"].as_str().unwrap_or("failed")).yellow()
            ),
          }
        }
        break;
      },
      Status::Error => {
        let reason = envelope
          .data
          .as_ref()
          .and_then(|data| data.get("error"))
          .and_then(JsonValue::as_str)
          .unwrap_or("unknown error")
          .to_string();
        rejected = Some(reason);
        break;
      },
      _ => {},
    }
  }

  match rejected {
    Some(reason) => Err(CliError::LookupRejected(reason)),
    None => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_values() {
    assert_eq!(param("limit=5").unwrap(), ("limit".to_string(), serde_json::json!(5)));
    assert_eq!(param("sort=published").unwrap().1, serde_json::json!("published"));
    assert_eq!(param(r#"select=["doi","title"]"#).unwrap().1, serde_json::json!(["doi", "title"]));
    assert!(param("=5").is_err());
    assert!(param("limit").is_err());
  }

  #[test]
  fn test_seconds() {
    assert_eq!(seconds("timeout", Some(1.5)).unwrap(), Some(Duration::from_millis(1500)));
    assert!(seconds("timeout", Some(0.0)).is_err());
    assert!(seconds("timeout", Some(1e20)).is_err());
    assert!(seconds("deadline", Some(f64::INFINITY)).is_err());
    assert_eq!(seconds("deadline", None).unwrap(), None);
  }
}
