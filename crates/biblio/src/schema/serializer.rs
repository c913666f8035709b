//! Mapping records to and from wire data.
//!
//! [`serialize`] walks a record's schema in declared order and renders each field according to
//! the policy. [`deserialize`] is its inverse and never fails: unknown keys are ignored, missing
//! fields stay absent and values that cannot be coerced to their declared type are logged and
//! dropped, so a partially malformed provider payload still yields a best-effort [`Record`].

use chrono::SecondsFormat;
use quick_xml::{
  events::{BytesEnd, BytesStart, BytesText, Event},
  Writer,
};

use super::{
  xml::{text_of, ATTRIBUTE_PREFIX, TEXT_KEY},
  *,
};

/// Renders `record` to the wire format of `policy`.
///
/// # Errors
///
/// Returns [`BiblioError::Serialization`] if the XML writer fails, or [`BiblioError::Json`] if
/// the JSON encoder does.
pub fn serialize(record: &Record, policy: &dyn FormatPolicy) -> Result<Wire> {
  match policy.format() {
    Format::Hash | Format::Obj => Ok(Wire::Tree(to_tree(record, policy))),
    Format::Json => Ok(Wire::Text(serde_json::to_string(&to_tree(record, policy))?)),
    Format::Xml => to_xml(record, policy).map(Wire::Text),
  }
}

/// Builds a record of `schema` from wire data in the format of `policy`.
///
/// JSON text that does not parse yields an empty record; malformed XML yields whatever was
/// parsed before the error. Both are logged at `warn`.
pub fn deserialize(schema: &SchemaRef, wire: &Wire, policy: &dyn FormatPolicy) -> Record {
  let tree = match (policy.format(), wire) {
    (Format::Xml, Wire::Text(text)) => xml::unwrap_root(xml::to_tree(text)),
    (_, Wire::Text(text)) => match serde_json::from_str::<JsonValue>(text) {
      Ok(tree) => tree,
      Err(e) => {
        warn!(schema = %schema.name(), error = %e, "Could not parse JSON payload");
        return Record::new(schema);
      },
    },
    (_, Wire::Tree(tree)) => tree.clone(),
  };
  let tree = if policy.normalizes_keys() { normalize_keys(tree, policy) } else { tree };
  from_tree(schema, &tree, policy)
}

/// Builds a record of `schema` from an already parsed key/value tree.
pub fn from_tree(schema: &SchemaRef, tree: &JsonValue, policy: &dyn FormatPolicy) -> Record {
  let mut record = Record::new(schema);
  let map = match tree {
    JsonValue::Object(map) => map,
    JsonValue::Null => return record,
    other => {
      match (content_field(schema), scalar_of(other)) {
        (Some(field), Some(_)) => {
          if let Some(value) = coerce_field(schema, field, other, policy) {
            record.insert(&field.name, value);
          }
        },
        _ => warn!(
          schema = %schema.name(),
          found = type_name(other),
          "Expected an object, leaving record empty"
        ),
      }
      return record;
    },
  };

  for field in schema.fields() {
    let Some(raw) = lookup(map, field, policy) else {
      if field.render.required {
        debug!(schema = %schema.name(), field = %field.name, "Required field is absent");
      }
      continue;
    };
    if let Some(value) = coerce_field(schema, field, raw, policy) {
      record.insert(&field.name, value);
    }
  }
  record
}

/// Renders `record` into a key/value tree (the Hash/Obj representation, also used for JSON).
pub fn to_tree(record: &Record, policy: &dyn FormatPolicy) -> JsonValue {
  let mut map = Map::new();
  for field in record.schema().fields() {
    let key = field.element_name(policy, Direction::Render);
    match record.get(&field.name) {
      None =>
        if !policy.omit_nil() {
          map.insert(key, JsonValue::Null);
        },
      Some(Value::List(items)) if items.is_empty() =>
        if !policy.omit_empty() {
          map.insert(key, JsonValue::Array(Vec::new()));
        },
      Some(value) => {
        map.insert(key, value_to_tree(value, policy));
      },
    }
  }
  JsonValue::Object(map)
}

fn value_to_tree(value: &Value, policy: &dyn FormatPolicy) -> JsonValue {
  match value {
    Value::Text(text) => JsonValue::String(text.clone()),
    Value::Integer(n) => JsonValue::from(*n),
    Value::Float(n) => serde_json::Number::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number),
    Value::Boolean(b) => JsonValue::Bool(*b),
    Value::DateTime(dt) => JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    Value::Record(record) => to_tree(record, policy),
    Value::List(items) => JsonValue::Array(items.iter().map(|v| value_to_tree(v, policy)).collect()),
  }
}

fn to_xml(record: &Record, policy: &dyn FormatPolicy) -> Result<String> {
  let mut writer = Writer::new(Vec::new());
  write_record(&mut writer, record.schema().root(), record, policy)?;
  String::from_utf8(writer.into_inner()).map_err(|e| BiblioError::Serialization(e.to_string()))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
  writer.write_event(event).map_err(|e| BiblioError::Serialization(e.to_string()))
}

fn write_record(
  writer: &mut Writer<Vec<u8>>,
  name: &str,
  record: &Record,
  policy: &dyn FormatPolicy,
) -> Result<()> {
  let mut start = BytesStart::new(name);
  let mut content = None;
  let mut children = Vec::new();
  for field in record.schema().fields() {
    if field.is_xml_attribute(policy) {
      if let Some(text) = record.get(&field.name).and_then(Value::to_text) {
        let attribute = field.attribute_name(policy, Direction::Render);
        start.push_attribute((attribute.as_str(), text.as_str()));
      }
    } else if field.render.content {
      content = record.get(&field.name).and_then(Value::to_text);
    } else if renders_element(record, field, policy) {
      children.push(field);
    }
  }

  if content.is_none() && children.is_empty() {
    return emit(writer, Event::Empty(start));
  }
  emit(writer, Event::Start(start))?;
  if let Some(text) = content {
    emit(writer, Event::Text(BytesText::new(&text)))?;
  }
  for field in children {
    write_field(writer, record, field, policy)?;
  }
  emit(writer, Event::End(BytesEnd::new(name)))
}

fn renders_element(record: &Record, field: &Field, policy: &dyn FormatPolicy) -> bool {
  match record.get(&field.name) {
    None => !policy.omit_nil(),
    Some(Value::List(items)) if items.is_empty() => !policy.omit_empty(),
    Some(_) => true,
  }
}

fn write_field(
  writer: &mut Writer<Vec<u8>>,
  record: &Record,
  field: &Field,
  policy: &dyn FormatPolicy,
) -> Result<()> {
  let name = field.element_name(policy, Direction::Render);
  match record.get(&field.name) {
    None => emit(writer, Event::Empty(BytesStart::new(name.as_str()))),
    Some(Value::List(items)) =>
      if field.is_wrapped(policy) {
        let container = pluralize(&name);
        if items.is_empty() {
          return emit(writer, Event::Empty(BytesStart::new(container.as_str())));
        }
        emit(writer, Event::Start(BytesStart::new(container.as_str())))?;
        for item in items {
          write_value(writer, &name, item, policy)?;
        }
        emit(writer, Event::End(BytesEnd::new(container.as_str())))
      } else {
        items.iter().try_for_each(|item| write_value(writer, &name, item, policy))
      },
    Some(value) => write_value(writer, &name, value, policy),
  }
}

fn write_value(
  writer: &mut Writer<Vec<u8>>,
  name: &str,
  value: &Value,
  policy: &dyn FormatPolicy,
) -> Result<()> {
  match value {
    Value::Record(record) => write_record(writer, name, record, policy),
    Value::List(items) => items.iter().try_for_each(|item| write_value(writer, name, item, policy)),
    scalar => {
      let text = scalar.to_text().unwrap_or_default();
      emit(writer, Event::Start(BytesStart::new(name)))?;
      emit(writer, Event::Text(BytesText::new(&text)))?;
      emit(writer, Event::End(BytesEnd::new(name)))
    },
  }
}

fn content_field(schema: &Schema) -> Option<&Field> {
  schema.fields().iter().find(|field| field.render.content)
}

/// Finds the raw wire value of `field` in `map`.
fn lookup<'a>(
  map: &'a Map<String, JsonValue>,
  field: &Field,
  policy: &dyn FormatPolicy,
) -> Option<&'a JsonValue> {
  if field.render.content {
    if let Some(text) = map.get(TEXT_KEY) {
      return Some(text);
    }
  }
  let element = field.element_name(policy, Direction::Parse);
  if field.render.attribute {
    let attribute = field.attribute_name(policy, Direction::Parse);
    if let Some(value) = map.get(&format!("{ATTRIBUTE_PREFIX}{attribute}")) {
      return Some(value);
    }
  }
  if field.is_wrapped(policy) {
    if let Some(JsonValue::Object(container)) = map.get(&pluralize(&element)) {
      if let Some(items) = container.get(&element) {
        return Some(items);
      }
    }
  }
  map.get(&element)
}

fn coerce_field(
  schema: &Schema,
  field: &Field,
  raw: &JsonValue,
  policy: &dyn FormatPolicy,
) -> Option<Value> {
  if raw.is_null() {
    return None;
  }
  let reject = |reason: String| {
    warn!(
      schema = %schema.name(),
      field = %field.name,
      value = %raw,
      reason = %reason,
      "Dropping value that does not match its declared type"
    );
  };

  match &field.kind {
    FieldKind::Scalar(scalar) => {
      let raw = first_of(raw)?;
      if is_blank(raw) && !matches!(scalar, ScalarType::Text) {
        return None;
      }
      match coerce_scalar(raw, scalar) {
        Ok(value) => Some(value),
        Err(reason) => {
          reject(reason);
          None
        },
      }
    },
    FieldKind::One(nested) => {
      let raw = first_of(raw)?;
      if is_blank(raw) {
        return None;
      }
      match coerce_record(nested, raw, policy) {
        Ok(record) => Some(Value::Record(record)),
        Err(reason) => {
          reject(reason);
          None
        },
      }
    },
    FieldKind::Many(element) => {
      // Single value -> wrap in array, nested arrays (Crossref date-parts) -> flatten
      let items: Vec<&JsonValue> = match raw {
        JsonValue::Array(items) => items
          .iter()
          .flat_map(|item| match item {
            JsonValue::Array(inner) => inner.iter().collect(),
            other => vec![other],
          })
          .collect(),
        single => vec![single],
      };
      let mut values = Vec::with_capacity(items.len());
      let keeps_blank = matches!(element, Element::Scalar(ScalarType::Text));
      for item in items.into_iter().filter(|item| !item.is_null() && (keeps_blank || !is_blank(item))) {
        let coerced = match element {
          Element::Scalar(scalar) => coerce_scalar(item, scalar),
          Element::Record(nested) => coerce_record(nested, item, policy).map(Value::Record),
        };
        match coerced {
          Ok(value) => values.push(value),
          Err(reason) => reject(reason),
        }
      }
      Some(Value::List(values))
    },
  }
}

/// An empty element carries no value for anything but text.
fn is_blank(raw: &JsonValue) -> bool { matches!(raw, JsonValue::String(text) if text.is_empty()) }

/// First non-null entry of an array, or the value itself.
fn first_of(raw: &JsonValue) -> Option<&JsonValue> {
  match raw {
    JsonValue::Array(items) => {
      if items.len() > 1 {
        trace!(count = items.len(), "Keeping the first of several values for a single field");
      }
      items.iter().find(|item| !item.is_null())
    },
    JsonValue::Null => None,
    other => Some(other),
  }
}

fn coerce_record(
  schema: &SchemaRef,
  raw: &JsonValue,
  policy: &dyn FormatPolicy,
) -> std::result::Result<Record, String> {
  match raw {
    JsonValue::Object(_) => Ok(from_tree(schema, raw, policy)),
    other if content_field(schema).is_some() && scalar_of(other).is_some() =>
      Ok(from_tree(schema, other, policy)),
    other => Err(format!("expected {} object, found {}", schema.name(), type_name(other))),
  }
}

fn scalar_of(value: &JsonValue) -> Option<&JsonValue> {
  match value {
    JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_) => Some(value),
    _ => None,
  }
}

/// Coerces one wire value to a declared scalar type.
pub fn coerce_scalar(raw: &JsonValue, scalar: &ScalarType) -> std::result::Result<Value, String> {
  if let JsonValue::Object(_) = raw {
    return match text_of(raw) {
      Some(text) => coerce_scalar(&JsonValue::String(text.to_string()), scalar),
      None => Err("expected a scalar, found object".to_string()),
    };
  }

  match scalar {
    ScalarType::Text => match raw {
      JsonValue::String(text) => Ok(Value::Text(text.clone())),
      JsonValue::Number(n) => Ok(Value::Text(n.to_string())),
      JsonValue::Bool(b) => Ok(Value::Text(b.to_string())),
      other => Err(format!("expected text, found {}", type_name(other))),
    },
    ScalarType::Integer => match raw {
      JsonValue::Number(n) => n
        .as_i64()
        .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .map(Value::Integer)
        .ok_or_else(|| format!("{n} is not an integer")),
      JsonValue::String(text) =>
        text.trim().parse().map(Value::Integer).map_err(|e| format!("'{text}': {e}")),
      other => Err(format!("expected integer, found {}", type_name(other))),
    },
    ScalarType::Float => match raw {
      JsonValue::Number(n) =>
        n.as_f64().map(Value::Float).ok_or_else(|| format!("{n} is not a number")),
      JsonValue::String(text) =>
        text.trim().parse().map(Value::Float).map_err(|e| format!("'{text}': {e}")),
      other => Err(format!("expected number, found {}", type_name(other))),
    },
    ScalarType::Boolean => match raw {
      JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
      JsonValue::Number(n) => match n.as_i64() {
        Some(0) => Ok(Value::Boolean(false)),
        Some(1) => Ok(Value::Boolean(true)),
        _ => Err(format!("{n} is not a boolean")),
      },
      JsonValue::String(text) => match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(Value::Boolean(true)),
        "false" | "no" | "n" | "0" => Ok(Value::Boolean(false)),
        _ => Err(format!("'{text}' is not a boolean")),
      },
      other => Err(format!("expected boolean, found {}", type_name(other))),
    },
    ScalarType::DateTime => match raw {
      JsonValue::String(text) =>
        parse_datetime(text).map(Value::DateTime).ok_or_else(|| format!("'{text}' is not a date")),
      JsonValue::Number(n) => n
        .as_i64()
        .and_then(|year| i32::try_from(year).ok())
        .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Value::DateTime(naive.and_utc()))
        .ok_or_else(|| format!("{n} is not a year")),
      other => Err(format!("expected date, found {}", type_name(other))),
    },
    ScalarType::Enumeration(allowed) => {
      let text = match raw {
        JsonValue::String(text) => text.clone(),
        JsonValue::Number(n) => n.to_string(),
        other => return Err(format!("expected enumeration value, found {}", type_name(other))),
      };
      allowed
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(text.trim()))
        .map(|candidate| Value::Text(candidate.clone()))
        .ok_or_else(|| format!("'{text}' is not one of {allowed:?}"))
    },
  }
}

/// Parses the date shapes providers send: RFC 3339, naive date-time, `YYYY-MM-DD`, `YYYY-MM`
/// and a bare `YYYY`.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
  let text = text.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
    return Some(dt.with_timezone(&Utc));
  }
  for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
      return Some(naive.and_utc());
    }
  }
  let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
    .ok()
    .or_else(|| NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d").ok())
    .or_else(|| {
      (text.len() == 4 && text.chars().all(|c| c.is_ascii_digit()))
        .then(|| text.parse().ok().and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)))
        .flatten()
    })?;
  date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

fn normalize_keys(tree: JsonValue, policy: &dyn FormatPolicy) -> JsonValue {
  match tree {
    JsonValue::Object(map) => JsonValue::Object(
      map
        .into_iter()
        .map(|(key, value)| {
          let key = if key.starts_with(ATTRIBUTE_PREFIX) || key == TEXT_KEY {
            key
          } else {
            policy.normalize_key(&key)
          };
          (key, normalize_keys(value, policy))
        })
        .collect(),
    ),
    JsonValue::Array(items) =>
      JsonValue::Array(items.into_iter().map(|item| normalize_keys(item, policy)).collect()),
    other => other,
  }
}

const fn type_name(value: &JsonValue) -> &'static str {
  match value {
    JsonValue::Null => "null",
    JsonValue::Bool(_) => "boolean",
    JsonValue::Number(_) => "number",
    JsonValue::String(_) => "string",
    JsonValue::Array(_) => "array",
    JsonValue::Object(_) => "object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  lazy_static! {
    static ref CONTRIBUTOR: SchemaRef = Schema::builder("contributor")
      .field(Field::text("role").attribute())
      .field(Field::text("name").content())
      .build()
      .unwrap();
    static ref BOOK: SchemaRef = Schema::builder("book")
      .field(Field::text("title").required())
      .field(Field::scalar("pages", ScalarType::Integer))
      .field(Field::scalar("price", ScalarType::Float))
      .field(Field::scalar("in_print", ScalarType::Boolean))
      .field(Field::scalar("published", ScalarType::DateTime))
      .field(Field::scalar("format", ScalarType::enumeration(["print", "ebook"])))
      .field(Field::many_text("subject"))
      .field(Field::many_records("contributor", &CONTRIBUTOR))
      .build()
      .unwrap();
  }

  fn book() -> Record {
    let mut melville = Record::new(&CONTRIBUTOR);
    melville.set("role", "author").unwrap();
    melville.set("name", "Herman Melville").unwrap();

    let mut record = Record::new(&BOOK);
    record.set("title", "Moby Dick").unwrap();
    record.set("pages", 635).unwrap();
    record.set("price", 12.5).unwrap();
    record.set("in_print", true).unwrap();
    record.set("published", parse_datetime("1851-10-18").unwrap()).unwrap();
    record.set("format", "print").unwrap();
    record.set("subject", vec!["Whales", "Sea stories"]).unwrap();
    record.set("contributor", vec![Value::Record(melville)]).unwrap();
    record
  }

  #[test]
  fn test_round_trip_all_formats() {
    let original = book();
    let mut padded = book();
    padded.set("title", " Moby Dick ").unwrap();
    padded.set("subject", vec!["", "  Whales"]).unwrap();
    for record in [&original, &padded] {
      round_trip(record);
    }
  }

  #[test]
  fn test_xml_keeps_blank_and_absent_apart() {
    let mut record = Record::new(&BOOK);
    record.set("title", "").unwrap();
    let policy = Format::Xml.policy().with_omit_nil(false);
    let wire = serialize(&record, &policy).unwrap();
    assert!(wire.as_text().unwrap().contains("<title></title>"));
    assert!(wire.as_text().unwrap().contains("<pages/>"));

    let parsed = deserialize(&BOOK, &wire, &policy);
    assert_eq!(parsed.text("title").as_deref(), Some(""));
    assert!(parsed.get("pages").is_none());
    assert_eq!(parsed, record);
  }

  fn round_trip(original: &Record) {
    for format in [Format::Hash, Format::Json, Format::Xml, Format::Obj] {
      let policy = format.policy();
      let wire = serialize(original, &policy).unwrap();
      let parsed = deserialize(&BOOK, &wire, &policy);
      assert_eq!(&parsed, original, "round trip through {format}");
    }
  }

  #[test]
  fn test_xml_rendering_shape() {
    let wire = serialize(&book(), &Format::Xml.policy()).unwrap();
    let xml = wire.as_text().unwrap();
    assert!(xml.starts_with("<book><title>Moby Dick</title>"));
    assert!(xml.contains("<inPrint>true</inPrint>"));
    assert!(xml.contains("<subjects><subject>Whales</subject><subject>Sea stories</subject></subjects>"));
    assert!(xml.contains(r#"<contributor role="author">Herman Melville</contributor>"#));
  }

  #[test]
  fn test_xml_attributes_as_elements_when_disabled() {
    let mut policy = Format::Xml.policy();
    policy.xml_attributes = false;
    let wire = serialize(&book(), &policy).unwrap();
    assert!(wire.as_text().unwrap().contains("<role>author</role>"));
    let parsed = deserialize(&BOOK, &wire, &policy);
    assert_eq!(parsed.records("contributor")[0].text("role").as_deref(), Some("author"));
  }

  #[test]
  fn test_nil_and_empty_policies() {
    let mut record = Record::new(&BOOK);
    record.set("title", "Untitled").unwrap();
    record.set("subject", Vec::<Value>::new()).unwrap();

    let hash = to_tree(&record, &Format::Hash.policy());
    assert_eq!(hash, json!({ "title": "Untitled", "subject": [] }));

    let obj = to_tree(&record, &Format::Obj.policy());
    assert_eq!(obj["pages"], JsonValue::Null);
    assert_eq!(obj["subject"], json!([]));

    let json = to_tree(&record, &Format::Json.policy());
    assert_eq!(json, json!({ "title": "Untitled" }));
  }

  #[test]
  fn test_single_value_wraps_into_collection() {
    let record =
      deserialize(&BOOK, &Wire::Tree(json!({ "subject": "Whales" })), &Format::Hash.policy());
    assert_eq!(record.texts("subject"), vec!["Whales"]);
  }

  #[test]
  fn test_unknown_keys_ignored_and_missing_left_absent() {
    let record = deserialize(
      &BOOK,
      &Wire::from(r#"{"title": "T", "unexpected": {"deep": 1}}"#),
      &Format::Json.policy(),
    );
    assert_eq!(record.text("title").as_deref(), Some("T"));
    assert!(record.get("pages").is_none());
    assert!(record.get("unexpected").is_none());
  }

  #[traced_test]
  #[test]
  fn test_malformed_scalars_are_dropped() {
    let record = deserialize(
      &BOOK,
      &Wire::from(
        r#"{"title": "T", "pages": "many", "in_print": "perhaps", "format": "scroll",
            "subject": ["ok", {"nested": true}], "published": "not a date"}"#,
      ),
      &Format::Json.policy(),
    );
    assert_eq!(record.text("title").as_deref(), Some("T"));
    assert!(record.get("pages").is_none());
    assert!(record.get("in_print").is_none());
    assert!(record.get("format").is_none());
    assert!(record.get("published").is_none());
    assert_eq!(record.texts("subject"), vec!["ok"]);
    assert!(logs_contain("Dropping value that does not match its declared type"));
  }

  #[traced_test]
  #[test]
  fn test_malformed_json_yields_empty_record() {
    let record = deserialize(&BOOK, &Wire::from("{\"title\": "), &Format::Json.policy());
    assert!(record.is_empty());
    assert!(logs_contain("Could not parse JSON payload"));
  }

  #[test]
  fn test_malformed_xml_yields_partial_record() {
    let record = deserialize(
      &BOOK,
      &Wire::from("<book><title>Partial</title><pages>12</pages><subject>x</book>"),
      &Format::Xml.policy(),
    );
    assert_eq!(record.text("title").as_deref(), Some("Partial"));
    assert_eq!(record.integer("pages"), Some(12));
  }

  #[test]
  fn test_key_normalization_before_lookup() {
    let schema = define_schema("work", vec![Field::text("doi"), Field::many_text("isbn_type")])
      .unwrap();
    let policy = Format::Hash.policy().with_key_transform(NameTransform::Underscore);
    let record =
      deserialize(&schema, &Wire::Tree(json!({ "DOI": "10.1/x", "isbn-type": ["print"] })), &policy);
    assert_eq!(record.text("doi").as_deref(), Some("10.1/x"));
    assert_eq!(record.texts("isbn_type"), vec!["print"]);
  }

  #[test]
  fn test_parse_datetime_shapes() {
    assert!(parse_datetime("2024-01-02T03:04:05Z").is_some());
    assert!(parse_datetime("2024-01-02T03:04:05").is_some());
    assert_eq!(parse_datetime("2024-01-02"), parse_datetime("2024-01-02T00:00:00Z"));
    assert_eq!(parse_datetime("2024-03"), parse_datetime("2024-03-01"));
    assert_eq!(parse_datetime("1851"), parse_datetime("1851-01-01"));
    assert!(parse_datetime("someday").is_none());
  }

  #[test]
  fn test_integer_from_float_and_text() {
    assert_eq!(coerce_scalar(&json!(3.0), &ScalarType::Integer), Ok(Value::Integer(3)));
    assert_eq!(coerce_scalar(&json!(" 42 "), &ScalarType::Integer), Ok(Value::Integer(42)));
    assert!(coerce_scalar(&json!(3.5), &ScalarType::Integer).is_err());
    assert_eq!(
      coerce_scalar(&json!({ "@x": "1", "$text": "7" }), &ScalarType::Integer),
      Ok(Value::Integer(7))
    );
  }
}
