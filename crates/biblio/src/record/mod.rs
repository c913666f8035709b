//! Schema-shaped records and the provider messages that carry them.
//!
//! A [`Record`] is an instance of a [`Schema`]: a mapping from field name to [`Value`] whose
//! runtime type matches the field's declared kind. Records are produced by
//! [`deserialize`](crate::schema::deserialize) or built directly by application code, and are
//! treated as read-only once an adapter returns them.
//!
//! A [`Message`] wraps one provider response (success or failure) together with the record
//! deserialized from it. Provider message types implement [`ApiMessage`] to dig the
//! business-relevant records out of their particular envelope.

use chrono::SecondsFormat;

use super::*;

mod message;

pub use self::message::*;

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  /// Text (also used for enumeration values).
  Text(String),
  /// Signed integer.
  Integer(i64),
  /// Floating point number.
  Float(f64),
  /// Boolean.
  Boolean(bool),
  /// Timestamp.
  DateTime(DateTime<Utc>),
  /// Nested record.
  Record(Record),
  /// Ordered list of values (a `many` field).
  List(Vec<Value>),
}

impl Value {
  /// Text form of a scalar value; `None` for records and lists.
  pub fn to_text(&self) -> Option<String> {
    match self {
      Self::Text(text) => Some(text.clone()),
      Self::Integer(n) => Some(n.to_string()),
      Self::Float(n) => Some(n.to_string()),
      Self::Boolean(b) => Some(b.to_string()),
      Self::DateTime(dt) => Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
      Self::Record(_) | Self::List(_) => None,
    }
  }

  /// The nested record, if this is one.
  pub fn as_record(&self) -> Option<&Record> {
    match self {
      Self::Record(record) => Some(record),
      _ => None,
    }
  }

  /// The nested record, mutably.
  pub fn as_record_mut(&mut self) -> Option<&mut Record> {
    match self {
      Self::Record(record) => Some(record),
      _ => None,
    }
  }

  /// The list items, if this is a list.
  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Self::List(items) => Some(items),
      _ => None,
    }
  }

  fn matches(&self, kind: &FieldKind) -> bool {
    match (kind, self) {
      (FieldKind::Scalar(scalar), value) => value.matches_scalar(scalar),
      (FieldKind::One(schema), Self::Record(record)) => record.schema().name() == schema.name(),
      (FieldKind::Many(element), Self::List(items)) => items.iter().all(|item| match element {
        Element::Scalar(scalar) => item.matches_scalar(scalar),
        Element::Record(schema) =>
          item.as_record().is_some_and(|record| record.schema().name() == schema.name()),
      }),
      _ => false,
    }
  }

  fn matches_scalar(&self, scalar: &ScalarType) -> bool {
    match (scalar, self) {
      (ScalarType::Text, Self::Text(_))
      | (ScalarType::Integer, Self::Integer(_))
      | (ScalarType::Float, Self::Float(_) | Self::Integer(_))
      | (ScalarType::Boolean, Self::Boolean(_))
      | (ScalarType::DateTime, Self::DateTime(_)) => true,
      (ScalarType::Enumeration(allowed), Self::Text(text)) => allowed.contains(text),
      _ => false,
    }
  }
}

impl From<&str> for Value {
  fn from(text: &str) -> Self { Self::Text(text.to_string()) }
}

impl From<String> for Value {
  fn from(text: String) -> Self { Self::Text(text) }
}

impl From<i32> for Value {
  fn from(n: i32) -> Self { Self::Integer(i64::from(n)) }
}

impl From<i64> for Value {
  fn from(n: i64) -> Self { Self::Integer(n) }
}

impl From<f64> for Value {
  fn from(n: f64) -> Self { Self::Float(n) }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self { Self::Boolean(b) }
}

impl From<DateTime<Utc>> for Value {
  fn from(dt: DateTime<Utc>) -> Self { Self::DateTime(dt) }
}

impl From<Record> for Value {
  fn from(record: Record) -> Self { Self::Record(record) }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(items: Vec<T>) -> Self { Self::List(items.into_iter().map(Into::into).collect()) }
}

/// An instance of a [`Schema`].
///
/// # Examples
///
/// ```
/// use biblio::{record::Record, schema::{define_schema, Field}};
///
/// let schema = define_schema("volume", vec![Field::text("title"), Field::many_text("author")])?;
/// let mut volume = Record::new(&schema);
/// volume.set("title", "Bartleby")?;
/// volume.set("author", vec!["Herman Melville"])?;
///
/// assert_eq!(volume.text("title").as_deref(), Some("Bartleby"));
/// assert_eq!(volume.texts("author"), vec!["Herman Melville"]);
/// assert!(volume.set("publisher", "Putnam's").is_err());
/// # Ok::<(), biblio::error::BiblioError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Record {
  schema: SchemaRef,
  values: BTreeMap<String, Value>,
}

impl PartialEq for Record {
  fn eq(&self, other: &Self) -> bool {
    self.schema.name() == other.schema.name() && self.values == other.values
  }
}

impl Record {
  /// An empty record of `schema`.
  pub fn new(schema: &SchemaRef) -> Self {
    Self { schema: Arc::clone(schema), values: BTreeMap::new() }
  }

  /// The record's schema.
  pub fn schema(&self) -> &SchemaRef { &self.schema }

  /// Whether no field has a value.
  pub fn is_empty(&self) -> bool { self.values.is_empty() }

  /// Sets a field after checking the value against its declaration.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Schema`] if the schema has no such field, or the value's type does not
  /// match the field's kind.
  pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
    let field = self.schema.field(name).ok_or_else(|| {
      BiblioError::Schema(format!("{} has no field '{name}'", self.schema.name()))
    })?;
    let value = value.into();
    if !value.matches(&field.kind) {
      return Err(BiblioError::Schema(format!(
        "value {value:?} does not match field '{name}' of {}",
        self.schema.name()
      )));
    }
    self.values.insert(name.to_string(), value);
    Ok(())
  }

  /// Builder form of [`Record::set`].
  pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
    self.set(name, value)?;
    Ok(self)
  }

  /// Clears a field.
  pub fn remove(&mut self, name: &str) -> Option<Value> { self.values.remove(name) }

  /// Inserts a value the deserializer has already coerced.
  pub(crate) fn insert(&mut self, name: &str, value: Value) {
    self.values.insert(name.to_string(), value);
  }

  /// The raw value of a field.
  pub fn get(&self, name: &str) -> Option<&Value> { self.values.get(name) }

  /// The raw value of a field, mutably. Used by adapters while normalizing a fresh response.
  pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> { self.values.get_mut(name) }

  /// Field values in schema order.
  pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
    self
      .schema
      .fields()
      .iter()
      .filter_map(|field| self.values.get(&field.name).map(|value| (field.name.as_str(), value)))
  }

  /// Text form of a scalar field, or of the first item of a `many` field.
  pub fn text(&self, name: &str) -> Option<String> {
    match self.get(name)? {
      Value::List(items) => items.iter().find_map(Value::to_text),
      value => value.to_text(),
    }
  }

  /// Text forms of every item of a `many` field (or the single scalar value).
  pub fn texts(&self, name: &str) -> Vec<String> {
    match self.get(name) {
      Some(Value::List(items)) => items.iter().filter_map(Value::to_text).collect(),
      Some(value) => value.to_text().into_iter().collect(),
      None => Vec::new(),
    }
  }

  /// An integer field.
  pub fn integer(&self, name: &str) -> Option<i64> {
    match self.get(name)? {
      Value::Integer(n) => Some(*n),
      _ => None,
    }
  }

  /// A boolean field.
  pub fn boolean(&self, name: &str) -> Option<bool> {
    match self.get(name)? {
      Value::Boolean(b) => Some(*b),
      _ => None,
    }
  }

  /// A timestamp field.
  pub fn datetime(&self, name: &str) -> Option<DateTime<Utc>> {
    match self.get(name)? {
      Value::DateTime(dt) => Some(*dt),
      _ => None,
    }
  }

  /// A nested record field (or the first record of a `many` field).
  pub fn record(&self, name: &str) -> Option<&Record> {
    match self.get(name)? {
      Value::Record(record) => Some(record),
      Value::List(items) => items.iter().find_map(Value::as_record),
      _ => None,
    }
  }

  /// Every nested record of a `many` field (or the single nested record).
  pub fn records(&self, name: &str) -> Vec<&Record> {
    match self.get(name) {
      Some(Value::List(items)) => items.iter().filter_map(Value::as_record).collect(),
      Some(Value::Record(record)) => vec![record],
      _ => Vec::new(),
    }
  }

  /// Follows a path of nested record fields (`["message", "items"]`) and returns the records at
  /// its end. Missing links yield an empty list.
  pub fn dig(&self, path: &[&str]) -> Vec<&Record> {
    match path {
      [] => vec![self],
      [last] => self.records(last),
      [first, rest @ ..] => self.record(first).map(|r| r.dig(rest)).unwrap_or_default(),
    }
  }

  /// Runs the stricter validation declared by the schema, if any.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Validation`] with the validator's reason when it rejects the record.
  pub fn validate(&self) -> Result<()> {
    match self.schema.validator() {
      Some(validator) => validator(self).map_err(|reason| BiblioError::Validation {
        schema: self.schema.name().to_string(),
        reason,
      }),
      None => Ok(()),
    }
  }
}
