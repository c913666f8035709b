//! Error types for the biblio library.
//!
//! Two layers of failure exist in the lookup core:
//! - [`TransportError`] describes a failed HTTP exchange with a provider. Adapters never propagate
//!   it; it is folded into the `exception` of the resulting [`Message`](crate::record::Message).
//! - [`BiblioError`] is everything else: invalid input, configuration problems, schema
//!   registration mistakes and the timeouts reported by the orchestrator.
//!
//! # Examples
//!
//! ```
//! use biblio::{error::BiblioError, identifier::Identifier};
//!
//! match Identifier::parse("isbn:not-a-number") {
//!   Err(BiblioError::InvalidIdentifier(value)) => println!("rejected {value}"),
//!   Err(e) => println!("other error: {e}"),
//!   Ok(id) => println!("parsed {id}"),
//! }
//! ```

use std::time::Duration;

use thiserror::Error;

/// Error type alias used for the [`biblio`](crate) crate.
pub type Result<T> = core::result::Result<T, BiblioError>;

/// Errors that can occur in the lookup and serialization core.
#[derive(Error, Debug)]
pub enum BiblioError {
  /// A provider call failed at the HTTP level.
  ///
  /// Adapters convert this into a message exception; it only surfaces as an error from the
  /// lower-level [`HttpClient`](crate::service::HttpClient) helpers.
  #[error(transparent)]
  Transport(#[from] TransportError),

  /// A payload could not be coerced to the declared schema at all.
  ///
  /// Field-level coercion problems are logged and dropped instead; this variant is reserved for
  /// callers that explicitly ask for strict handling.
  #[error("Could not deserialize {schema}: {reason}")]
  Deserialization {
    /// Name of the schema being populated.
    schema: String,
    /// Description of what went wrong.
    reason: String,
  },

  /// A single provider did not finish within its configured timeout.
  #[error("Service {service} timed out after {timeout:?}")]
  ProviderTimeout {
    /// Name of the provider.
    service: String,
    /// The timeout that elapsed.
    timeout: Duration,
  },

  /// The overall lookup deadline elapsed while providers were still in flight.
  #[error("Lookup deadline of {0:?} elapsed")]
  AggregateTimeout(Duration),

  /// A provider is referenced without configuration, or cannot serve the request.
  #[error("Configuration error: {0}")]
  Configuration(String),

  /// The lookup request itself is unusable (e.g. no terms at all).
  #[error("Invalid request: {0}")]
  InvalidRequest(String),

  /// A standard identifier could not be parsed or failed its checksum.
  #[error("Invalid identifier: {0}")]
  InvalidIdentifier(String),

  /// A schema declaration was rejected at registration time.
  #[error("Schema error: {0}")]
  Schema(String),

  /// A record failed the stricter validation declared by its schema.
  #[error("Validation failed for {schema}: {reason}")]
  Validation {
    /// Name of the schema whose validator rejected the record.
    schema: String,
    /// Reason reported by the validator.
    reason: String,
  },

  /// A record could not be rendered to the requested wire format.
  #[error("Serialization error: {0}")]
  Serialization(String),

  /// An Internet Archive item is still being generated and cannot be downloaded yet.
  #[error("Item not ready: {0}")]
  NotReady(String),

  /// An S3 object fetch failed.
  #[error("S3 error: {0}")]
  S3(String),

  /// A file system operation failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A network request failed outside of an adapter call.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// JSON encoding or decoding failed.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A TOML configuration file could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),
}

/// Failure of a single HTTP exchange with an external provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
  /// The request did not complete within the adapter timeout.
  #[error("request timed out")]
  Timeout,

  /// The connection could not be established.
  #[error("connection failed: {0}")]
  Connect(String),

  /// The provider answered with a non-success HTTP status.
  #[error("HTTP {code}: {body}")]
  Status {
    /// HTTP status code.
    code: u16,
    /// Response body (possibly truncated) for diagnostics.
    body: String,
  },

  /// The response body could not be read or decoded.
  #[error("malformed response: {0}")]
  Malformed(String),

  /// The request could not be built or sent for another reason.
  #[error("request failed: {0}")]
  Request(String),
}

impl TransportError {
  /// HTTP status associated with the failure, if the provider answered at all.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status { code, .. } => Some(*code),
      _ => None,
    }
  }
}

impl From<reqwest::Error> for TransportError {
  fn from(error: reqwest::Error) -> Self {
    if error.is_timeout() {
      Self::Timeout
    } else if error.is_connect() {
      Self::Connect(error.to_string())
    } else if error.is_decode() || error.is_body() {
      Self::Malformed(error.to_string())
    } else if let Some(status) = error.status() {
      Self::Status { code: status.as_u16(), body: error.to_string() }
    } else {
      Self::Request(error.to_string())
    }
  }
}
