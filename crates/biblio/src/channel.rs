//! Envelopes exchanged with the asynchronous channel transport.
//!
//! The transport itself (delivery to a browser session) lives outside this crate. What is fixed
//! here is the shape of the messages: one inbound [`ChannelRequest`] per logical lookup, and a
//! stream of outbound [`Envelope`]s. A lookup always emits `STARTING` first and ends with exactly
//! one `COMPLETE` or `ERROR`.
//!
//! ```json
//! { "status": "PARTIAL", "service": "crossref", "time": "2024-05-01T12:00:00Z",
//!   "job_id": "6a1f...", "class": "LookupItem", "duration": 0.42, "count": 3, "data": [...] }
//! ```

use uuid::Uuid;

use super::*;
use crate::lookup::{LookupOptions, LookupRequest};

/// Envelope status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
  /// The lookup has been accepted and providers are being queried.
  Starting,
  /// One provider has finished.
  Partial,
  /// Every provider has finished or the deadline elapsed.
  Complete,
  /// The request could not be processed at all.
  Error,
  /// Intermediate progress of a multi-step job.
  Step,
}

impl Status {
  /// Whether this status ends the envelope stream.
  pub const fn is_terminal(self) -> bool { matches!(self, Self::Complete | Self::Error) }
}

impl Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Starting => write!(f, "STARTING"),
      Self::Partial => write!(f, "PARTIAL"),
      Self::Complete => write!(f, "COMPLETE"),
      Self::Error => write!(f, "ERROR"),
      Self::Step => write!(f, "STEP"),
    }
  }
}

/// A single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
  /// One value.
  One(String),
  /// Several values.
  Many(Vec<String>),
}

impl OneOrMany {
  /// The values as a list.
  pub fn into_vec(self) -> Vec<String> {
    match self {
      Self::One(value) => vec![value],
      Self::Many(values) => values,
    }
  }
}

/// Outbound channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
  /// Envelope status.
  pub status:   Status,
  /// Provider(s) the envelope reports on.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub service:  Option<OneOrMany>,
  /// Requesting user.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user:     Option<String>,
  /// When the envelope was produced.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub time:     Option<DateTime<Utc>>,
  /// Correlates every envelope of one lookup.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub job_id:   Option<Uuid>,
  /// Type name of the items in `data`.
  #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
  pub class:    Option<String>,
  /// Seconds spent so far (PARTIAL: by the provider; COMPLETE: by the whole lookup).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration: Option<f64>,
  /// Number of items in `data`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub count:    Option<usize>,
  /// Tells the client to drop the data (e.g. a superseded request).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub discard:  Option<bool>,
  /// Payload.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data:     Option<JsonValue>,
}

impl Envelope {
  /// A time-stamped envelope with only a status.
  pub fn new(status: Status) -> Self {
    Self {
      status,
      service: None,
      user: None,
      time: Some(Utc::now()),
      job_id: None,
      class: None,
      duration: None,
      count: None,
      discard: None,
      data: None,
    }
  }

  /// Sets a single service.
  pub fn service(mut self, service: impl Into<String>) -> Self {
    self.service = Some(OneOrMany::One(service.into()));
    self
  }

  /// Sets several services.
  pub fn services(mut self, services: Vec<String>) -> Self {
    self.service = Some(OneOrMany::Many(services));
    self
  }

  /// Sets the user.
  pub fn user(mut self, user: Option<String>) -> Self {
    self.user = user;
    self
  }

  /// Sets the job id.
  pub fn job(mut self, job_id: Uuid) -> Self {
    self.job_id = Some(job_id);
    self
  }

  /// Sets the payload class name.
  pub fn class(mut self, class: impl Into<String>) -> Self {
    self.class = Some(class.into());
    self
  }

  /// Sets the duration.
  pub fn duration(mut self, duration: Duration) -> Self {
    self.duration = Some(duration.as_secs_f64());
    self
  }

  /// Sets the discard flag.
  pub fn discard(mut self, discard: bool) -> Self {
    self.discard = Some(discard);
    self
  }

  /// Sets the payload, and the count when it is a list.
  pub fn data(mut self, data: JsonValue) -> Self {
    if let JsonValue::Array(items) = &data {
      self.count = Some(items.len());
    }
    self.data = Some(data);
    self
  }

  /// The service names this envelope reports on.
  pub fn service_names(&self) -> Vec<String> {
    self.service.clone().map(OneOrMany::into_vec).unwrap_or_default()
  }
}

/// Inbound channel message: `{ "terms": string | string[], "options": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRequest {
  /// Search terms, each `kind:value`, an identifier or free text.
  pub terms:   OneOrMany,
  /// Lookup options.
  #[serde(default)]
  pub options: ChannelOptions,
}

/// Options accepted in a [`ChannelRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelOptions {
  /// Services to query (default: every enabled service).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub services: Option<OneOrMany>,
  /// Per-service timeout in seconds, overriding configuration.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout:  Option<f64>,
  /// Overall deadline in seconds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deadline: Option<f64>,
  /// Requesting user, echoed on every envelope.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user:     Option<String>,
  /// Provider-specific options (`select`, `limit`, `schema`, ...).
  #[serde(flatten)]
  pub params:   BTreeMap<String, JsonValue>,
}

impl ChannelRequest {
  /// Parses an inbound JSON message.
  pub fn from_json(json: &str) -> Result<Self> { Ok(serde_json::from_str(json)?) }

  /// Converts into a lookup request.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::InvalidRequest`] for non-positive or out-of-range waits and
  /// [`BiblioError::InvalidIdentifier`] for malformed `kind:value` identifier terms.
  pub fn into_request(self) -> Result<LookupRequest> {
    let seconds = |what: &str, value: Option<f64>| -> Result<Option<Duration>> {
      match value {
        None => Ok(None),
        Some(s) => wait_seconds(s).map(Some).ok_or_else(|| {
          BiblioError::InvalidRequest(format!(
            "{what} must be positive and at most {} seconds, got {s}",
            MAX_WAIT.as_secs()
          ))
        }),
      }
    };
    let options = LookupOptions {
      services: self.options.services.map(OneOrMany::into_vec),
      timeout:  seconds("timeout", self.options.timeout)?,
      deadline: seconds("deadline", self.options.deadline)?,
      user:     self.options.user,
      params:   self.options.params,
    };
    Ok(LookupRequest::from_terms(self.terms.into_vec())?.with_options(options))
  }
}
