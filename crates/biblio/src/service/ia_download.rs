//! Internet Archive on-the-fly download adapter.
//!
//! Derived formats are generated on request, so fetching one is a two-phase protocol: [`probe`]
//! asks for the file and learns whether it is ready (`2xx`), still being generated (`202`) or
//! unavailable (anything else); [`download`] probes first and streams the bytes only once the
//! file is ready. While waiting or on error, the Archive answers with `{status, message}` JSON.
//!
//! [`probe`]: IaDownloadService::probe
//! [`download`]: IaDownloadService::download

use super::*;

/// File name used when neither the headers nor the URL provide one.
const FALLBACK_FILENAME: &str = "download";

lazy_static! {
  static ref STATUS_MESSAGE: MessageType = MessageType::new(
    &define_schema("ia_status", vec![Field::text("status"), Field::text("message")])
      .expect("valid Internet Archive status schema"),
  );
}

/// Outcome of a probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
  /// The file is being generated (HTTP 202).
  pub waiting: bool,
  /// The file can be downloaded (HTTP 2xx).
  pub ready:   bool,
  /// The file is unavailable or the request failed.
  pub error:   bool,
  /// HTTP status, absent if no response arrived.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status:  Option<u16>,
  /// Explanation from the Archive (or from the transport).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl ProbeResult {
  fn from_status(status: u16, message: Option<String>) -> Self {
    Self {
      waiting: status == 202,
      ready: status != 202 && (200..300).contains(&status),
      error: !(200..300).contains(&status),
      status: Some(status),
      message,
    }
  }

  fn failed(error: &TransportError) -> Self {
    Self { error: true, status: error.status(), message: Some(error.to_string()), ..Self::default() }
  }
}

/// Extracts the file name from a `Content-Disposition` header.
///
/// An RFC 5987 `filename*` is decoded and preferred over a plain `filename`.
///
/// ```
/// use biblio::service::ia_download::parse_content_disposition;
///
/// assert_eq!(
///   parse_content_disposition(r#"attachment; filename="plain.pdf"; filename*=UTF-8''na%C3%AFve%20copy.pdf"#),
///   Some("naïve copy.pdf".to_string())
/// );
/// assert_eq!(parse_content_disposition("attachment; filename=moby.epub"), Some("moby.epub".to_string()));
/// assert_eq!(parse_content_disposition("inline"), None);
/// ```
pub fn parse_content_disposition(header: &str) -> Option<String> {
  let mut plain = None;
  let mut extended = None;
  for parameter in split_parameters(header).into_iter().skip(1) {
    let Some((name, value)) = parameter.split_once('=') else { continue };
    match name.trim().to_ascii_lowercase().as_str() {
      "filename*" => extended = decode_extended(value.trim()),
      "filename" => plain = Some(unquote(value.trim())),
      _ => {},
    }
  }
  extended.or(plain).map(|name| sanitize_filename(&name)).filter(|name| !name.is_empty())
}

/// Splits on `;` outside of quoted strings.
fn split_parameters(header: &str) -> Vec<String> {
  let mut parts = Vec::new();
  let mut current = String::new();
  let mut quoted = false;
  let mut escaped = false;
  for c in header.chars() {
    match c {
      _ if escaped => {
        current.push(c);
        escaped = false;
      },
      '\\' if quoted => {
        current.push(c);
        escaped = true;
      },
      '"' => {
        current.push(c);
        quoted = !quoted;
      },
      ';' if !quoted => parts.push(std::mem::take(&mut current)),
      _ => current.push(c),
    }
  }
  parts.push(current);
  parts
}

fn unquote(value: &str) -> String {
  match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
    Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
    None => value.to_string(),
  }
}

/// `charset'language'percent-encoded`
fn decode_extended(value: &str) -> Option<String> {
  let mut parts = value.splitn(3, '\'');
  let charset = parts.next()?.to_ascii_lowercase();
  let _language = parts.next()?;
  let encoded = parts.next()?;
  let bytes = urlencoding::decode_binary(encoded.as_bytes());
  match charset.as_str() {
    "utf-8" | "" => String::from_utf8(bytes.into_owned()).ok(),
    "iso-8859-1" | "latin1" => Some(bytes.iter().map(|&b| char::from(b)).collect()),
    other => {
      debug!(charset = other, "Unsupported filename* charset");
      None
    },
  }
}

/// Keeps only the final path component, so a header cannot point outside the target directory.
fn sanitize_filename(name: &str) -> String {
  name.rsplit(['/', '\\']).next().unwrap_or_default().trim().trim_start_matches('.').to_string()
}

/// Last path segment of `url`, percent-decoded.
fn filename_from_url(url: &str) -> Option<String> {
  let parsed = url::Url::parse(url).ok()?;
  let segment = parsed.path_segments()?.filter(|segment| !segment.is_empty()).last()?;
  let decoded = urlencoding::decode(segment).map(|s| s.into_owned()).unwrap_or_else(|_| segment.to_string());
  Some(sanitize_filename(&decoded)).filter(|name| !name.is_empty())
}

/// Internet Archive download adapter.
#[derive(Debug, Clone)]
pub struct IaDownloadService {
  client:  HttpClient,
  dialect: Dialect,
}

impl IaDownloadService {
  /// Builds the adapter.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Network`] if the HTTP client cannot be created.
  pub fn new(settings: ServiceSettings) -> Result<Self> {
    Ok(Self { client: HttpClient::new(settings)?, dialect: Dialect::for_format(Format::Json) })
  }

  /// Resolved settings.
  pub fn settings(&self) -> &ServiceSettings { self.client.settings() }

  /// Asks for the file at `url` (absolute, or relative to the base URL) and reports its state.
  ///
  /// A ready file's body is not read.
  #[instrument(skip(self), fields(service = %self.client.settings().name), level = "debug")]
  pub async fn probe(&self, url: &str) -> ProbeResult {
    let response = match self.client.send(url, &QueryParams::new()).await {
      Ok(response) => response,
      Err(error) => {
        warn!(url, error = %error, "Probe failed");
        return ProbeResult::failed(&error);
      },
    };
    let status = response.status().as_u16();
    if status != 202 && (200..300).contains(&status) {
      debug!(url, status, "File is ready");
      return ProbeResult::from_status(status, None);
    }

    let body = response.text().await.unwrap_or_default();
    let message = STATUS_MESSAGE.parse(&self.client.settings().name, Some(status), Wire::Text(body), &self.dialect);
    let text = message.record.text("message").or_else(|| message.record.text("status"));
    if status == 202 {
      debug!(url, message = ?text, "File is being generated");
    } else {
      warn!(url, status, message = ?text, "File is unavailable");
    }
    ProbeResult::from_status(status, text)
  }

  /// Probes `url` and, once the file is ready, streams it into `dir`. Returns the written path.
  ///
  /// The file name comes from `Content-Disposition`, else from the URL.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::NotReady`] while the file is still being generated,
  /// [`BiblioError::Transport`] if the probe or the download fails, and I/O errors from writing.
  #[instrument(skip(self, dir), fields(service = %self.client.settings().name), level = "debug")]
  pub async fn download(&self, url: &str, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let probe = self.probe(url).await;
    if probe.waiting {
      return Err(BiblioError::NotReady(
        probe.message.unwrap_or_else(|| "file is being generated".to_string()),
      ));
    }
    if !probe.ready {
      let error = match probe.status {
        Some(code) => TransportError::Status { code, body: probe.message.unwrap_or_default() },
        None => TransportError::Request(probe.message.unwrap_or_default()),
      };
      return Err(error.into());
    }

    let mut response = self.client.send(url, &QueryParams::new()).await?;
    let status = response.status().as_u16();
    if !(200..300).contains(&status) || status == 202 {
      return Err(TransportError::Status { code: status, body: String::new() }.into());
    }

    let filename = response
      .headers()
      .get(reqwest::header::CONTENT_DISPOSITION)
      .and_then(|value| value.to_str().ok())
      .and_then(parse_content_disposition)
      .or_else(|| filename_from_url(&self.client.url(url)))
      .unwrap_or_else(|| FALLBACK_FILENAME.to_string());
    let path = dir.as_ref().join(filename);

    let mut file = PartialFile::create(path).await?;
    while let Some(chunk) = response.chunk().await.map_err(TransportError::from)? {
      file.write(&chunk).await?;
    }
    let written = file.written();
    let path = file.commit().await?;
    info!(path = %path.display(), bytes = written, "Downloaded file");
    Ok(path)
  }
}
