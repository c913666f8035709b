//! Per-provider settings, loaded once at startup.
//!
//! Configuration comes from a TOML file (by default `lookup.toml` in the platform config
//! directory). Every field is optional: a missing file, table or key falls back to built-in
//! defaults. The loaded [`LookupConfig`] is never mutated during a lookup; adapters and the
//! orchestrator receive resolved [`ServiceSettings`] by value.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use biblio::configuration::LookupConfig;
//!
//! let config: LookupConfig = r#"
//!   [defaults]
//!   priority = 10
//!
//!   [services.crossref]
//!   timeout = 8.0
//!   mailto  = "catalog@example.org"
//!
//!   [services.worldcat]
//!   enabled = false
//! "#
//! .parse()?;
//!
//! let crossref = config.service("crossref")?;
//! assert_eq!(crossref.timeout, Duration::from_secs(8));
//! assert_eq!(crossref.mailto.as_deref(), Some("catalog@example.org"));
//! assert!(!config.service("worldcat")?.enabled);
//! assert!(config.service("nonesuch").is_err());
//! # Ok::<(), biblio::error::BiblioError>(())
//! ```

use super::*;

/// Built-in service name for Crossref.
pub const CROSSREF: &str = "crossref";
/// Built-in service name for Google Books.
pub const GOOGLE_BOOKS: &str = "google_books";
/// Built-in service name for WorldCat.
pub const WORLDCAT: &str = "worldcat";
/// Built-in service name for Internet Archive downloads.
pub const IA_DOWNLOAD: &str = "ia_download";

/// Longest timeout or deadline accepted, from configuration or from a request.
pub const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Converts a number of seconds into a wait bounded by [`MAX_WAIT`].
///
/// Returns `None` for values that are not finite, not positive or longer than [`MAX_WAIT`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use biblio::configuration::wait_seconds;
///
/// assert_eq!(wait_seconds(2.5), Some(Duration::from_millis(2500)));
/// assert_eq!(wait_seconds(0.0), None);
/// assert_eq!(wait_seconds(1e20), None);
/// ```
pub fn wait_seconds(seconds: f64) -> Option<Duration> {
  Duration::try_from_secs_f64(seconds).ok().filter(|wait| !wait.is_zero() && *wait <= MAX_WAIT)
}

/// Services that can answer a bibliographic search.
pub const LOOKUP_SERVICES: [&str; 3] = [CROSSREF, GOOGLE_BOOKS, WORLDCAT];

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupConfig {
  /// Fallback values for services that do not set their own.
  #[serde(default)]
  pub defaults:    Defaults,
  /// Instrumentation switches passed into every adapter.
  #[serde(default)]
  pub diagnostics: Diagnostics,
  /// Per-service overrides, keyed by service name.
  #[serde(default)]
  pub services:    BTreeMap<String, ServiceConfig>,
  /// S3/BiblioVault object storage.
  #[serde(default)]
  pub s3:          S3Config,
}

/// Global fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
  /// Priority for services without one (lower is more authoritative).
  pub priority: u32,
  /// Per-service timeout in seconds.
  pub timeout:  f64,
  /// Overall lookup deadline in seconds.
  pub deadline: f64,
}

impl Default for Defaults {
  fn default() -> Self { Self { priority: 100, timeout: 10.0, deadline: 15.0 } }
}

/// Constructor-injected instrumentation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostics {
  /// Debug-log every outbound URL and its query parameters.
  pub log_requests: bool,
  /// Trace-log raw response bodies.
  pub log_payloads: bool,
  /// Info-log the elapsed time of every call.
  pub log_timing:   bool,
}

/// One `[services.<name>]` table. Unset keys fall back to the built-in defaults for the service,
/// then to [`Defaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
  /// Whether the service takes part in lookups.
  pub enabled:  Option<bool>,
  /// Lower numbers are more authoritative for their identifier types.
  pub priority: Option<u32>,
  /// Per-call timeout in seconds.
  pub timeout:  Option<f64>,
  /// Identifier types the service can search by.
  pub types:    Option<Vec<IdentifierKind>>,
  /// Base URL of the provider API.
  pub base_url: Option<String>,
  /// Provider API key (`key` for Google Books, `wskey` for WorldCat).
  pub api_key:  Option<String>,
  /// Contact address for the Crossref polite pool.
  pub mailto:   Option<String>,
}

/// S3/BiblioVault settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct S3Config {
  /// AWS region.
  pub region:         Option<String>,
  /// Bucket used when none can be inferred from an item path.
  pub default_bucket: Option<String>,
  /// Buckets recognizable by name inside item paths or hostnames.
  pub buckets:        Vec<String>,
  /// Alternative endpoint (S3-compatible storage).
  pub endpoint_url:   Option<String>,
}

/// Fully resolved settings for one service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
  /// Service name.
  pub name:        String,
  /// Whether the service takes part in lookups.
  pub enabled:     bool,
  /// Lower numbers are more authoritative.
  pub priority:    u32,
  /// Per-call timeout.
  pub timeout:     Duration,
  /// Identifier types the service can search by.
  pub types:       Vec<IdentifierKind>,
  /// Base URL of the provider API.
  pub base_url:    String,
  /// Provider API key.
  pub api_key:     Option<String>,
  /// Crossref polite-pool contact.
  pub mailto:      Option<String>,
  /// Instrumentation switches.
  pub diagnostics: Diagnostics,
}

impl ServiceSettings {
  /// Settings for an ad hoc service, mainly useful in tests and for custom adapters.
  pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
    let defaults = Defaults::default();
    Self {
      name:        name.into(),
      enabled:     true,
      priority:    defaults.priority,
      timeout:     Duration::from_secs_f64(defaults.timeout),
      types:       Vec::new(),
      base_url:    base_url.into(),
      api_key:     None,
      mailto:      None,
      diagnostics: Diagnostics::default(),
    }
  }

  /// Whether the service can search by `kind`.
  pub fn supports(&self, kind: IdentifierKind) -> bool { self.types.contains(&kind) }
}

struct Builtin {
  name:     &'static str,
  priority: u32,
  timeout:  f64,
  types:    &'static [IdentifierKind],
  base_url: &'static str,
}

const BUILTINS: [Builtin; 4] = [
  Builtin {
    name:     CROSSREF,
    priority: 1,
    timeout:  5.0,
    types:    &[IdentifierKind::Doi, IdentifierKind::Isbn, IdentifierKind::Issn],
    base_url: "https://api.crossref.org",
  },
  Builtin {
    name:     GOOGLE_BOOKS,
    priority: 2,
    timeout:  5.0,
    types:    &[IdentifierKind::Isbn, IdentifierKind::Lccn, IdentifierKind::Oclc],
    base_url: "https://www.googleapis.com",
  },
  Builtin {
    name:     WORLDCAT,
    priority: 3,
    timeout:  8.0,
    types:    &[IdentifierKind::Isbn, IdentifierKind::Issn, IdentifierKind::Oclc, IdentifierKind::Lccn],
    base_url: "https://www.worldcat.org",
  },
  Builtin {
    name:     IA_DOWNLOAD,
    priority: 100,
    timeout:  30.0,
    types:    &[],
    base_url: "https://archive.org",
  },
];

impl LookupConfig {
  /// Default location of the configuration file.
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("biblio").join("lookup.toml")
  }

  /// Loads [`LookupConfig::default_path`], or the built-in defaults if it does not exist.
  pub fn load_default() -> Result<Self> {
    let path = Self::default_path();
    if path.exists() {
      Self::from_file(path)
    } else {
      debug!(path = %path.display(), "No configuration file, using built-in defaults");
      Ok(Self::default())
    }
  }

  /// Loads a configuration file.
  ///
  /// # Errors
  ///
  /// Returns an I/O error if the file cannot be read, a TOML error if it does not parse, and
  /// [`BiblioError::Configuration`] for out-of-range values.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let config: Self = content.parse()?;
    info!(path = %path.display(), services = config.services.len(), "Loaded configuration");
    Ok(config)
  }

  /// Checks value ranges that the TOML types cannot express.
  pub fn validate(&self) -> Result<()> {
    let check = |what: &str, seconds: f64| checked_wait(what, seconds).map(|_| ());
    check("defaults.timeout", self.defaults.timeout)?;
    check("defaults.deadline", self.defaults.deadline)?;
    for (name, service) in &self.services {
      if let Some(timeout) = service.timeout {
        check(&format!("services.{name}.timeout"), timeout)?;
      }
    }
    Ok(())
  }

  /// Resolved settings for `name`.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Configuration`] if the service has neither a `[services.<name>]`
  /// table nor a built-in default.
  pub fn service(&self, name: &str) -> Result<ServiceSettings> {
    let configured = self.services.get(name);
    let builtin = BUILTINS.iter().find(|builtin| builtin.name == name);
    if configured.is_none() && builtin.is_none() {
      return Err(BiblioError::Configuration(format!("no configuration for service '{name}'")));
    }
    let configured = configured.cloned().unwrap_or_default();

    let base_url = configured
      .base_url
      .or_else(|| builtin.map(|b| b.base_url.to_string()))
      .ok_or_else(|| BiblioError::Configuration(format!("service '{name}' has no base_url")))?;

    Ok(ServiceSettings {
      name: name.to_string(),
      enabled: configured.enabled.unwrap_or(true),
      priority: configured
        .priority
        .or_else(|| builtin.map(|b| b.priority))
        .unwrap_or(self.defaults.priority),
      timeout: checked_wait(
        &format!("services.{name}.timeout"),
        configured.timeout.or_else(|| builtin.map(|b| b.timeout)).unwrap_or(self.defaults.timeout),
      )?,
      types: configured
        .types
        .or_else(|| builtin.map(|b| b.types.to_vec()))
        .unwrap_or_default(),
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: configured.api_key,
      mailto: configured.mailto,
      diagnostics: self.diagnostics,
    })
  }

  /// Names of every known service (built-in and configured), sorted.
  pub fn service_names(&self) -> Vec<String> {
    let mut names: Vec<String> = BUILTINS.iter().map(|builtin| builtin.name.to_string()).collect();
    names.extend(self.services.keys().cloned());
    names.sort();
    names.dedup();
    names
  }

  /// Overall lookup deadline. Out-of-range values (only possible when the struct was built
  /// without [`validate`](Self::validate)) are clamped to [`MAX_WAIT`].
  pub fn deadline(&self) -> Duration { wait_seconds(self.defaults.deadline).unwrap_or(MAX_WAIT) }
}

fn checked_wait(what: &str, seconds: f64) -> Result<Duration> {
  wait_seconds(seconds).ok_or_else(|| {
    BiblioError::Configuration(format!(
      "{what} must be a positive number of seconds no greater than {}",
      MAX_WAIT.as_secs()
    ))
  })
}

impl FromStr for LookupConfig {
  type Err = BiblioError;

  fn from_str(s: &str) -> Result<Self> {
    let config: Self = toml::from_str(s)?;
    config.validate()?;
    Ok(config)
  }
}
