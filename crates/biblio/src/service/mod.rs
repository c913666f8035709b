//! HTTP plumbing and the remote service adapters.
//!
//! Every adapter owns an [`HttpClient`] built from its resolved
//! [`ServiceSettings`](crate::configuration::ServiceSettings). The client applies the service's
//! timeout, logs according to the injected [`Diagnostics`](crate::configuration::Diagnostics) and
//! turns every transport failure into a [`TransportError`] that adapters fold into a message
//! exception.
//!
//! # Adapters
//!
//! - [`crossref`]: Crossref REST API (`/works`)
//! - [`google_books`]: Google Books volumes API
//! - [`worldcat`]: WorldCat OpenSearch and SRU
//! - [`ia_download`]: Internet Archive on-the-fly download probing and streaming
//! - [`aws_s3`]: BiblioVault object streaming from S3

use std::time::Instant;

use tokio::io::AsyncWriteExt;

use super::*;

pub mod aws_s3;
pub mod crossref;
pub mod google_books;
pub mod ia_download;
pub mod worldcat;

/// User agent sent with every provider request.
pub const USER_AGENT: &str = concat!("biblio/", env!("CARGO_PKG_VERSION"));

/// Longest response body kept in a [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Ordered query-string parameters. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
  /// No parameters.
  pub fn new() -> Self { Self::default() }

  /// Appends a parameter.
  pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.0.push((key.into(), value.into()));
  }

  /// Builder form of [`QueryParams::push`].
  pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.push(key, value);
    self
  }

  /// Replaces every value of `key` with `value`.
  pub fn set(&mut self, key: &str, value: impl Into<String>) {
    self.remove(key);
    self.push(key, value);
  }

  /// First value of `key`.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
  }

  /// Removes every value of `key`.
  pub fn remove(&mut self, key: &str) { self.0.retain(|(k, _)| k != key); }

  /// Renames `from` to `to`, keeping positions.
  pub fn rename(&mut self, from: &str, to: &str) {
    for (key, _) in self.0.iter_mut().filter(|(key, _)| key == from) {
      *key = to.to_string();
    }
  }

  /// Whether there are no parameters.
  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// Parameters in insertion order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Parameters as a slice, as expected by `reqwest::RequestBuilder::query`.
  pub fn as_slice(&self) -> &[(String, String)] { &self.0 }
}

/// A successful (2xx) response with its body read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
  /// HTTP status.
  pub status:              u16,
  /// `Content-Type` header.
  pub content_type:        Option<String>,
  /// `Content-Disposition` header.
  pub content_disposition: Option<String>,
  /// Response body.
  pub body:                String,
  /// Time spent on the exchange.
  pub elapsed:             Duration,
}

/// Per-service HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClient {
  client:   reqwest::Client,
  settings: ServiceSettings,
  renames:  Vec<(String, String)>,
}

impl HttpClient {
  /// Builds a client applying the service timeout.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Network`] if the TLS backend cannot be initialized.
  pub fn new(settings: ServiceSettings) -> Result<Self> {
    let client =
      reqwest::Client::builder().user_agent(USER_AGENT).timeout(settings.timeout).build()?;
    Ok(Self { client, settings, renames: Vec::new() })
  }

  /// Renames a query parameter just before each request is sent.
  pub fn with_param_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
    self.renames.push((from.into(), to.into()));
    self
  }

  /// The settings this client was built from.
  pub fn settings(&self) -> &ServiceSettings { &self.settings }

  /// Absolute URL for `path` (a full URL is used as is).
  pub fn url(&self, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
      path.to_string()
    } else {
      format!("{}/{}", self.settings.base_url, path.trim_start_matches('/'))
    }
  }

  /// Sends a GET and returns the response whatever its status.
  pub async fn send(
    &self,
    path: &str,
    params: &QueryParams,
  ) -> std::result::Result<reqwest::Response, TransportError> {
    let url = self.url(path);
    let mut params = params.clone();
    for (from, to) in &self.renames {
      params.rename(from, to);
    }
    if self.settings.diagnostics.log_requests {
      debug!(service = %self.settings.name, url = %url, params = ?params.as_slice(), "Sending request");
    }
    let response = self.client.get(&url).query(params.as_slice()).send().await?;
    Ok(response)
  }

  /// Sends a GET and reads the body, treating any non-2xx status as a failure.
  #[instrument(skip(self, params), fields(service = %self.settings.name), level = "debug")]
  pub async fn get(
    &self,
    path: &str,
    params: &QueryParams,
  ) -> std::result::Result<RawResponse, TransportError> {
    let started = Instant::now();
    let response = self.send(path, params).await?;
    let status = response.status().as_u16();
    let header = |name: reqwest::header::HeaderName| {
      response.headers().get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
    };
    let content_type = header(reqwest::header::CONTENT_TYPE);
    let content_disposition = header(reqwest::header::CONTENT_DISPOSITION);
    let body = response.text().await?;
    let elapsed = started.elapsed();

    if self.settings.diagnostics.log_timing {
      info!(service = %self.settings.name, status, elapsed_ms = elapsed.as_millis() as u64, "Request finished");
    }
    if self.settings.diagnostics.log_payloads {
      trace!(service = %self.settings.name, body = %body, "Response body");
    }

    if !(200..300).contains(&status) {
      let mut body = body;
      if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
          cut -= 1;
        }
        body.truncate(cut);
      }
      return Err(TransportError::Status { code: status, body });
    }

    Ok(RawResponse { status, content_type, content_disposition, body, elapsed })
  }

  /// GETs `path` and deserializes the body as `message_type`.
  ///
  /// Never fails: a transport error, a non-2xx status or a body that is not a document of the
  /// policy's format comes back as an exception-bearing [`Message`].
  pub async fn fetch(
    &self,
    path: &str,
    params: &QueryParams,
    message_type: &MessageType,
    policy: &dyn FormatPolicy,
  ) -> Message {
    let started = Instant::now();
    let name = self.settings.name.as_str();
    let raw = match self.get(path, params).await {
      Ok(raw) => raw,
      Err(error) => {
        warn!(service = %name, error = %error, "Provider request failed");
        return message_type.failed(name, error).with_elapsed(started.elapsed());
      },
    };
    if let Err(reason) = check_document(&raw.body, policy.format()) {
      warn!(service = %name, reason = %reason, "Provider returned a malformed document");
      let mut message = message_type.failed(name, TransportError::Malformed(reason));
      message.status = Some(raw.status);
      return message.with_elapsed(raw.elapsed);
    }
    message_type.parse(name, Some(raw.status), Wire::Text(raw.body), policy).with_elapsed(raw.elapsed)
  }
}

/// A download written under a hidden `.part` name next to its destination.
///
/// [`commit`](Self::commit) moves it into place; dropping it uncommitted deletes the partial file,
/// so an interrupted transfer never leaves a truncated file under the final name.
pub(crate) struct PartialFile {
  file:      tokio::fs::File,
  partial:   PathBuf,
  path:      PathBuf,
  written:   u64,
  committed: bool,
}

impl PartialFile {
  /// Creates the partial file for `path`.
  pub(crate) async fn create(path: PathBuf) -> Result<Self> {
    let name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
    let partial = path.with_file_name(format!(".{name}.part"));
    let file = tokio::fs::File::create(&partial).await?;
    Ok(Self { file, partial, path, written: 0, committed: false })
  }

  pub(crate) async fn write(&mut self, chunk: &[u8]) -> Result<()> {
    self.file.write_all(chunk).await?;
    self.written += chunk.len() as u64;
    Ok(())
  }

  pub(crate) fn written(&self) -> u64 { self.written }

  /// Flushes and renames the file to its final name.
  pub(crate) async fn commit(mut self) -> Result<PathBuf> {
    self.file.flush().await?;
    self.file.sync_all().await?;
    tokio::fs::rename(&self.partial, &self.path).await?;
    self.committed = true;
    Ok(self.path.clone())
  }
}

impl Drop for PartialFile {
  fn drop(&mut self) {
    if !self.committed {
      debug!(path = %self.partial.display(), "Removing incomplete download");
      if let Err(error) = std::fs::remove_file(&self.partial) {
        warn!(path = %self.partial.display(), error = %error, "Could not remove incomplete download");
      }
    }
  }
}

/// Rejects bodies that are not a document of `format` at all.
fn check_document(body: &str, format: Format) -> std::result::Result<(), String> {
  match format {
    Format::Json => serde_json::from_str::<serde::de::IgnoredAny>(body)
      .map(|_| ())
      .map_err(|e| format!("invalid JSON: {e}")),
    Format::Xml if !body.trim_start().starts_with('<') => Err("body is not XML".to_string()),
    _ => Ok(()),
  }
}
