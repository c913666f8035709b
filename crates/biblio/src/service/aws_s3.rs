//! BiblioVault object streaming from S3.
//!
//! Not a search provider: an item path names an object directly. The bucket is inferred from a
//! known bucket name appearing as a hostname label or as the first path segment, falling back to
//! the configured default bucket. Objects are streamed chunk by chunk into a file.
//!
//! Storage access sits behind the [`ObjectSource`] trait; [`AwsObjectSource`] implements it with
//! `aws-sdk-s3`.

use aws_config::BehaviorVersion;
use aws_sdk_s3::{config::Region, error::DisplayErrorContext, primitives::ByteStream, Client};
use futures::{stream::BoxStream, StreamExt};

use super::*;
use crate::service::ia_download::parse_content_disposition;

/// An object being streamed.
pub struct ObjectStream {
  /// `Content-Type` of the object.
  pub content_type:        Option<String>,
  /// Size in bytes, if known.
  pub content_length:      Option<u64>,
  /// `Content-Disposition` of the object.
  pub content_disposition: Option<String>,
  /// Object bytes, chunk by chunk.
  pub body:                BoxStream<'static, Result<Vec<u8>>>,
}

impl fmt::Debug for ObjectStream {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ObjectStream")
      .field("content_type", &self.content_type)
      .field("content_length", &self.content_length)
      .field("content_disposition", &self.content_disposition)
      .finish_non_exhaustive()
  }
}

/// Read access to object storage.
#[async_trait]
pub trait ObjectSource: Send + Sync {
  /// Opens `key` in `bucket` for streaming.
  async fn open(&self, bucket: &str, key: &str) -> Result<ObjectStream>;
}

/// [`ObjectSource`] backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsObjectSource {
  client: Client,
}

impl AwsObjectSource {
  /// Loads AWS credentials from the environment and applies the configured region and endpoint.
  pub async fn from_config(config: &S3Config) -> Self {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
      loader = loader.region(Region::new(region.clone()));
    }
    let sdk_config = loader.load().await;
    let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
    if let Some(endpoint) = &config.endpoint_url {
      builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    Self { client: Client::from_conf(builder.build()) }
  }
}

fn byte_chunks(body: ByteStream) -> BoxStream<'static, Result<Vec<u8>>> {
  futures::stream::unfold(Some(body), |state| async move {
    let mut body = state?;
    match body.try_next().await {
      Ok(Some(chunk)) => Some((Ok(chunk.to_vec()), Some(body))),
      Ok(None) => None,
      Err(error) => Some((Err(BiblioError::S3(error.to_string())), None)),
    }
  })
  .boxed()
}

#[async_trait]
impl ObjectSource for AwsObjectSource {
  #[instrument(skip(self), level = "debug")]
  async fn open(&self, bucket: &str, key: &str) -> Result<ObjectStream> {
    let output = self
      .client
      .get_object()
      .bucket(bucket)
      .key(key)
      .send()
      .await
      .map_err(|error| BiblioError::S3(DisplayErrorContext(&error).to_string()))?;
    Ok(ObjectStream {
      content_type:        output.content_type().map(str::to_string),
      content_length:      output.content_length().and_then(|length| u64::try_from(length).ok()),
      content_disposition: output.content_disposition().map(str::to_string),
      body:                byte_chunks(output.body),
    })
  }
}

/// Resolves BiblioVault item paths and streams them to disk.
#[derive(Clone)]
pub struct S3Fetcher {
  source: Arc<dyn ObjectSource>,
  config: S3Config,
}

impl fmt::Debug for S3Fetcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("S3Fetcher").field("config", &self.config).finish_non_exhaustive()
  }
}

impl S3Fetcher {
  /// A fetcher over any object source.
  pub fn new(source: Arc<dyn ObjectSource>, config: S3Config) -> Self { Self { source, config } }

  /// A fetcher over AWS S3.
  pub async fn from_config(config: &S3Config) -> Self {
    Self::new(Arc::new(AwsObjectSource::from_config(config).await), config.clone())
  }

  /// Splits an item path into `(bucket, key)`.
  ///
  /// Accepts `s3://bucket/key`, `https://bucket.s3.amazonaws.com/key`,
  /// `https://s3.amazonaws.com/bucket/key`, `bucket/key` and bare keys.
  ///
  /// # Examples
  ///
  /// ```
  /// use std::sync::Arc;
  ///
  /// # use biblio::{configuration::S3Config, service::aws_s3::{ObjectSource, ObjectStream, S3Fetcher}};
  /// # struct Nothing;
  /// # #[async_trait::async_trait]
  /// # impl ObjectSource for Nothing {
  /// #   async fn open(&self, _: &str, _: &str) -> biblio::error::Result<ObjectStream> { unimplemented!() }
  /// # }
  /// let config = S3Config {
  ///   buckets: vec!["bv-vault".into()],
  ///   default_bucket: Some("bv-ingest".into()),
  ///   ..S3Config::default()
  /// };
  /// let fetcher = S3Fetcher::new(Arc::new(Nothing), config);
  ///
  /// let located = fetcher.locate("https://bv-vault.s3.amazonaws.com/books/moby.zip")?;
  /// assert_eq!(located, ("bv-vault".to_string(), "books/moby.zip".to_string()));
  /// assert_eq!(fetcher.locate("books/moby.zip")?.0, "bv-ingest");
  /// # Ok::<(), biblio::error::BiblioError>(())
  /// ```
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Configuration`] when no bucket can be inferred and no default bucket
  /// is configured, and [`BiblioError::InvalidRequest`] for a path without a key.
  pub fn locate(&self, item_path: &str) -> Result<(String, String)> {
    let item_path = item_path.trim();
    let (host, path) = match url::Url::parse(item_path) {
      Ok(url) if url.has_host() => {
        let path = urlencoding::decode(url.path()).map(|p| p.into_owned()).unwrap_or_else(|_| url.path().to_string());
        (url.host_str().map(str::to_string), path)
      },
      _ => (None, item_path.to_string()),
    };
    let path = path.trim_start_matches('/');
    let scheme_s3 = item_path.starts_with("s3://");

    let known = |name: &str| self.config.buckets.iter().any(|bucket| bucket == name);
    let host_bucket = host.as_deref().and_then(|host| {
      if scheme_s3 {
        return Some(host.to_string());
      }
      self
        .config
        .buckets
        .iter()
        .find(|bucket| host == bucket.as_str() || host.starts_with(&format!("{bucket}.")))
        .cloned()
    });

    let (bucket, key) = match host_bucket {
      Some(bucket) => (bucket, path.to_string()),
      None => match path.split_once('/') {
        Some((first, rest)) if known(first) => (first.to_string(), rest.to_string()),
        _ => {
          let bucket = self.config.default_bucket.clone().ok_or_else(|| {
            BiblioError::Configuration(format!(
              "cannot infer a bucket for '{item_path}' and no default_bucket is configured"
            ))
          })?;
          (bucket, path.to_string())
        },
      },
    };
    if key.is_empty() {
      return Err(BiblioError::InvalidRequest(format!("no object key in '{item_path}'")));
    }
    Ok((bucket, key))
  }

  /// Streams the object named by `item_path` into `dir`. Returns the written path.
  ///
  /// # Errors
  ///
  /// Returns the [`S3Fetcher::locate`] errors, [`BiblioError::S3`] for storage failures and I/O
  /// errors from writing.
  #[instrument(skip(self, dir), level = "debug")]
  pub async fn fetch(&self, item_path: &str, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let (bucket, key) = self.locate(item_path)?;
    debug!(bucket = %bucket, key = %key, "Opening object");
    let mut object = self.source.open(&bucket, &key).await?;

    let filename = object
      .content_disposition
      .as_deref()
      .and_then(parse_content_disposition)
      .or_else(|| key.rsplit('/').next().filter(|name| !name.is_empty()).map(str::to_string))
      .ok_or_else(|| BiblioError::InvalidRequest(format!("no file name for '{key}'")))?;
    let path = dir.as_ref().join(filename);

    let mut file = PartialFile::create(path).await?;
    while let Some(chunk) = object.body.next().await {
      file.write(&chunk?).await?;
    }
    let written = file.written();
    let path = file.commit().await?;
    if let Some(expected) = object.content_length.filter(|expected| *expected != written) {
      warn!(expected, written, "Object size differs from Content-Length");
    }
    info!(bucket = %bucket, key = %key, bytes = written, path = %path.display(), "Fetched object");
    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Memory {
    chunks: Vec<&'static str>,
    fail:   bool,
  }

  #[async_trait]
  impl ObjectSource for Memory {
    async fn open(&self, bucket: &str, key: &str) -> Result<ObjectStream> {
      if bucket != "bv-vault" {
        return Err(BiblioError::S3(format!("NoSuchBucket: {bucket}")));
      }
      let mut chunks: Vec<Result<Vec<u8>>> =
        self.chunks.iter().map(|chunk| Ok(chunk.as_bytes().to_vec())).collect();
      if self.fail {
        chunks.push(Err(BiblioError::S3("connection reset".to_string())));
      }
      Ok(ObjectStream {
        content_type:        Some("application/zip".to_string()),
        content_length:      None,
        content_disposition: key.ends_with("named.zip").then(|| "attachment; filename=\"renamed.zip\"".to_string()),
        body:                futures::stream::iter(chunks).boxed(),
      })
    }
  }

  fn fetcher(fail: bool) -> S3Fetcher {
    S3Fetcher::new(Arc::new(Memory { chunks: vec!["PK", "\u{3}\u{4}", "rest"], fail }), S3Config {
      buckets: vec!["bv-vault".to_string(), "bv-archive".to_string()],
      ..S3Config::default()
    })
  }

  #[test]
  fn test_locate_variants() {
    let fetcher = fetcher(false);
    assert_eq!(
      fetcher.locate("s3://anything/a/b.zip").unwrap(),
      ("anything".to_string(), "a/b.zip".to_string())
    );
    assert_eq!(
      fetcher.locate("https://s3.amazonaws.com/bv-archive/a/b.zip").unwrap(),
      ("bv-archive".to_string(), "a/b.zip".to_string())
    );
    assert_eq!(fetcher.locate("bv-vault/x.zip").unwrap(), ("bv-vault".to_string(), "x.zip".to_string()));
    assert!(matches!(fetcher.locate("unknown/x.zip"), Err(BiblioError::Configuration(_))));
    assert!(matches!(fetcher.locate("s3://bv-vault/"), Err(BiblioError::InvalidRequest(_))));
  }

  #[tokio::test]
  async fn test_fetch_streams_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = fetcher(false).fetch("bv-vault/books/moby.zip", dir.path()).await.unwrap();
    assert_eq!(path, dir.path().join("moby.zip"));
    assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04rest");

    let path = fetcher(false).fetch("bv-vault/books/named.zip", dir.path()).await.unwrap();
    assert_eq!(path.file_name().unwrap(), "renamed.zip");
  }

  #[tokio::test]
  async fn test_fetch_surfaces_stream_errors() {
    let dir = tempfile::tempdir().unwrap();
    let result = fetcher(true).fetch("bv-vault/books/moby.zip", dir.path()).await;
    assert!(matches!(result, Err(BiblioError::S3(_))));
    assert!(!dir.path().join("moby.zip").exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
  }
}
