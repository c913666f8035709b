use super::*;

/// Static description of a provider message type: its schema plus the wrapping each wire format
/// needs before deserialization.
///
/// # Examples
///
/// ```
/// use biblio::{
///   record::{Message, MessageType},
///   schema::{define_schema, Field, Format, WrapStrategy, Wire},
/// };
///
/// let ids = define_schema("ids", vec![Field::many_text("id")])?;
/// let message_type = MessageType::new(&ids).wrap(Format::Json, WrapStrategy::Template(r#"{"id": {data}}"#.into()));
///
/// let message = message_type.parse("demo", Some(200), Wire::from("[1, 2]"), &Format::Json.policy());
/// assert_eq!(message.record.texts("id"), vec!["1", "2"]);
/// # Ok::<(), biblio::error::BiblioError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MessageType {
  schema:   SchemaRef,
  wrapping: Vec<(Format, WrapStrategy)>,
}

impl MessageType {
  /// A message type with no wrapping for any format.
  pub fn new(schema: &SchemaRef) -> Self { Self { schema: Arc::clone(schema), wrapping: Vec::new() } }

  /// Declares the wrapping applied to raw data in `format`.
  pub fn wrap(mut self, format: Format, strategy: WrapStrategy) -> Self {
    self.wrapping.retain(|(existing, _)| *existing != format);
    self.wrapping.push((format, strategy));
    self
  }

  /// The message schema.
  pub fn schema(&self) -> &SchemaRef { &self.schema }

  /// The wrapping declared for `format` ([`WrapStrategy::NoWrap`] if none).
  pub fn wrapping(&self, format: Format) -> WrapStrategy {
    self
      .wrapping
      .iter()
      .find(|(candidate, _)| *candidate == format)
      .map(|(_, strategy)| strategy.clone())
      .unwrap_or_default()
  }

  /// Wraps and deserializes a successful provider response.
  pub fn parse(
    &self,
    service: &str,
    status: Option<u16>,
    wire: Wire,
    policy: &dyn FormatPolicy,
  ) -> Message {
    let wire = self.wrapping(policy.format()).apply(wire, policy.format(), self.schema.root());
    let record = deserialize(&self.schema, &wire, policy);
    Message { service: service.to_string(), status, exception: None, elapsed: None, record }
  }

  /// An exception-bearing message for a failed exchange.
  pub fn failed(&self, service: &str, error: TransportError) -> Message {
    Message::error(service, &self.schema, error)
  }
}

/// One provider response, successful or not.
///
/// Callers branch on [`Message::exception`]: adapters never propagate transport failures, they
/// record them here and return an empty [`Message::record`].
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
  /// Provider that produced the message.
  pub service:   String,
  /// HTTP status, absent when the transport failed before a response arrived.
  pub status:    Option<u16>,
  /// The failure, if the exchange did not succeed.
  pub exception: Option<TransportError>,
  /// Time spent on the exchange.
  pub elapsed:   Option<Duration>,
  /// The deserialized response body.
  pub record:    Record,
}

impl Message {
  /// A successful message holding `record`.
  pub fn new(service: impl Into<String>, record: Record) -> Self {
    Self { service: service.into(), status: None, exception: None, elapsed: None, record }
  }

  /// An exception-bearing message with an empty record of `schema`.
  pub fn error(service: impl Into<String>, schema: &SchemaRef, error: TransportError) -> Self {
    Self {
      service:   service.into(),
      status:    error.status(),
      exception: Some(error),
      elapsed:   None,
      record:    Record::new(schema),
    }
  }

  /// Records the time spent on the exchange.
  pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
    self.elapsed = Some(elapsed);
    self
  }

  /// Whether the exchange succeeded.
  pub fn is_ok(&self) -> bool { self.exception.is_none() }
}

/// A provider message that knows where its business records live.
pub trait ApiMessage: Send + Sync {
  /// The underlying message.
  fn message(&self) -> &Message;

  /// The normalized records buried in the provider's envelope.
  ///
  /// Implementations never fail: missing or nil structure yields an empty list.
  fn api_records(&self) -> Vec<Record>;

  /// The transport failure, if any.
  fn exception(&self) -> Option<&TransportError> { self.message().exception.as_ref() }

  /// HTTP status of the response, if one arrived.
  fn status(&self) -> Option<u16> { self.message().status }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_wrapping_per_format() {
    let schema = define_schema("list", vec![Field::many_text("entry")]).unwrap();
    let message_type = MessageType::new(&schema)
      .wrap(Format::Json, WrapStrategy::Wrap(true))
      .wrap(Format::Xml, WrapStrategy::NoWrap);
    assert_eq!(message_type.wrapping(Format::Json), WrapStrategy::Wrap(true));
    assert_eq!(message_type.wrapping(Format::Hash), WrapStrategy::NoWrap);
  }

  #[test]
  fn test_failed_message_keeps_status() {
    let schema = define_schema("empty_body", vec![Field::text("x")]).unwrap();
    let message = MessageType::new(&schema)
      .failed("demo", TransportError::Status { code: 503, body: "busy".to_string() });
    assert!(!message.is_ok());
    assert_eq!(message.status, Some(503));
    assert!(message.record.is_empty());
  }
}
