//! Wire formats and the per-format policy hooks used by the serializer.
//!
//! A [`FormatPolicy`] answers every dialect question the serializer has: how names are
//! transformed in each direction, whether empty collections and nil scalars are rendered, whether
//! XML attribute fields become real attributes and whether repeated XML elements are wrapped in a
//! plural container. [`Dialect`] is the data-driven implementation used by the built-in formats
//! and by every provider adapter.

use super::*;

/// Concrete wire representations a record can be mapped to and from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
  /// In-memory key/value tree.
  Hash,
  /// JSON text.
  Json,
  /// XML text.
  Xml,
  /// In-memory object tree that keeps nils and empties explicit.
  Obj,
}

impl Format {
  /// The default policy for this format.
  pub fn policy(self) -> Dialect { Dialect::for_format(self) }

  /// Whether this format is carried as text (as opposed to an in-memory tree).
  pub const fn is_text(self) -> bool { matches!(self, Self::Json | Self::Xml) }
}

impl Display for Format {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Hash => write!(f, "hash"),
      Self::Json => write!(f, "json"),
      Self::Xml => write!(f, "xml"),
      Self::Obj => write!(f, "obj"),
    }
  }
}

/// Direction of a naming transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  /// Looking up a field's name in incoming wire data.
  Parse,
  /// Producing a field's name in outgoing wire data.
  Render,
}

/// Dialect hooks consulted by [`serialize`] and [`deserialize`].
///
/// Every method has a default, so an implementor only overrides what its wire dialect changes.
pub trait FormatPolicy: Send + Sync {
  /// The wire format this policy applies to.
  fn format(&self) -> Format;

  /// Wire name for an element (or JSON/Hash key) derived from a schema field name.
  fn element_name(&self, name: &str, _direction: Direction) -> String { name.to_string() }

  /// Wire name for an XML attribute derived from a schema field name.
  fn attribute_name(&self, name: &str, direction: Direction) -> String {
    self.element_name(name, direction)
  }

  /// Transliteration applied to every incoming key before fields are looked up.
  ///
  /// Providers with dasherized or upper-case keys (`isbn-type`, `DOI`) normalize them here so the
  /// generic deserializer only ever sees one naming convention.
  fn normalize_key(&self, key: &str) -> String { key.to_string() }

  /// Whether the policy changes keys at all (lets the deserializer skip a tree rewrite).
  fn normalizes_keys(&self) -> bool { false }

  /// Omit empty collections when rendering.
  fn omit_empty(&self) -> bool { true }

  /// Omit absent scalar and nested-record fields when rendering.
  fn omit_nil(&self) -> bool { true }

  /// (XML only) Render attribute fields as XML attributes rather than child elements.
  fn xml_attributes(&self) -> bool { true }

  /// (XML only) Wrap repeated elements in a container named after the field's plural.
  fn wrap_collections(&self) -> bool { false }
}

/// Data-driven [`FormatPolicy`].
///
/// # Examples
///
/// ```
/// use biblio::schema::{Dialect, Direction, Format, FormatPolicy, NameTransform};
///
/// let google = Dialect::for_format(Format::Json).with_elements(NameTransform::LowerCamel);
/// assert_eq!(google.element_name("total_items", Direction::Parse), "totalItems");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
  /// Wire format.
  pub format:            Format,
  /// Element naming when parsing.
  pub parse_elements:    NameTransform,
  /// Element naming when rendering.
  pub render_elements:   NameTransform,
  /// Attribute naming when parsing.
  pub parse_attributes:  NameTransform,
  /// Attribute naming when rendering.
  pub render_attributes: NameTransform,
  /// Transliteration of incoming keys, if any.
  pub key_transform:     Option<NameTransform>,
  /// Omit empty collections when rendering.
  pub omit_empty:        bool,
  /// Omit nil fields when rendering.
  pub omit_nil:          bool,
  /// Render attribute fields as XML attributes.
  pub xml_attributes:    bool,
  /// Wrap repeated XML elements in a plural container.
  pub wrap_collections:  bool,
}

impl Dialect {
  /// Built-in policy for a format.
  ///
  /// | format | naming     | empty collections | nil fields | XML attributes | XML wrapping |
  /// |--------|------------|-------------------|------------|----------------|--------------|
  /// | Hash   | identity   | rendered          | omitted    | -              | -            |
  /// | Obj    | identity   | rendered          | rendered   | -              | -            |
  /// | Json   | identity   | omitted           | omitted    | -              | -            |
  /// | Xml    | lowerCamel | omitted           | omitted    | yes            | yes          |
  pub fn for_format(format: Format) -> Self {
    let base = Self {
      format,
      parse_elements: NameTransform::Identity,
      render_elements: NameTransform::Identity,
      parse_attributes: NameTransform::Identity,
      render_attributes: NameTransform::Identity,
      key_transform: None,
      omit_empty: true,
      omit_nil: true,
      xml_attributes: true,
      wrap_collections: false,
    };
    match format {
      Format::Hash => Self { omit_empty: false, ..base },
      Format::Obj => Self { omit_empty: false, omit_nil: false, ..base },
      Format::Json => base,
      Format::Xml => Self { wrap_collections: true, ..base }
        .with_elements(NameTransform::LowerCamel)
        .with_attributes(NameTransform::LowerCamel),
    }
  }

  /// Uses `transform` for element names in both directions.
  pub fn with_elements(mut self, transform: NameTransform) -> Self {
    self.parse_elements = transform;
    self.render_elements = transform;
    self
  }

  /// Uses `transform` for attribute names in both directions.
  pub fn with_attributes(mut self, transform: NameTransform) -> Self {
    self.parse_attributes = transform;
    self.render_attributes = transform;
    self
  }

  /// Transliterates every incoming key with `transform` before lookup.
  pub fn with_key_transform(mut self, transform: NameTransform) -> Self {
    self.key_transform = Some(transform);
    self
  }

  /// Sets whether repeated XML elements are wrapped.
  pub fn with_wrapping(mut self, wrap: bool) -> Self {
    self.wrap_collections = wrap;
    self
  }

  /// Sets whether empty collections are omitted.
  pub fn with_omit_empty(mut self, omit: bool) -> Self {
    self.omit_empty = omit;
    self
  }

  /// Sets whether nil fields are omitted.
  pub fn with_omit_nil(mut self, omit: bool) -> Self {
    self.omit_nil = omit;
    self
  }
}

impl FormatPolicy for Dialect {
  fn format(&self) -> Format { self.format }

  fn element_name(&self, name: &str, direction: Direction) -> String {
    match direction {
      Direction::Parse => self.parse_elements.apply(name),
      Direction::Render => self.render_elements.apply(name),
    }
  }

  fn attribute_name(&self, name: &str, direction: Direction) -> String {
    match direction {
      Direction::Parse => self.parse_attributes.apply(name),
      Direction::Render => self.render_attributes.apply(name),
    }
  }

  fn normalize_key(&self, key: &str) -> String {
    match self.key_transform {
      Some(transform) => transform.apply(key),
      None => key.to_string(),
    }
  }

  fn normalizes_keys(&self) -> bool { self.key_transform.is_some() }

  fn omit_empty(&self) -> bool { self.omit_empty }

  fn omit_nil(&self) -> bool { self.omit_nil }

  fn xml_attributes(&self) -> bool { self.xml_attributes }

  fn wrap_collections(&self) -> bool { self.wrap_collections }
}

/// Serialized (or raw) wire data.
#[derive(Debug, Clone, PartialEq)]
pub enum Wire {
  /// In-memory tree (Hash and Obj formats).
  Tree(JsonValue),
  /// Text document (JSON and XML formats).
  Text(String),
}

impl Wire {
  /// The text payload, if this is a text document.
  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(text) => Some(text),
      Self::Tree(_) => None,
    }
  }

  /// The tree payload, if this is an in-memory tree.
  pub fn as_tree(&self) -> Option<&JsonValue> {
    match self {
      Self::Tree(tree) => Some(tree),
      Self::Text(_) => None,
    }
  }
}

impl From<&str> for Wire {
  fn from(text: &str) -> Self { Self::Text(text.to_string()) }
}

impl From<String> for Wire {
  fn from(text: String) -> Self { Self::Text(text) }
}

impl From<JsonValue> for Wire {
  fn from(tree: JsonValue) -> Self { Self::Tree(tree) }
}

/// Placeholder replaced by the raw data in a [`WrapStrategy::Template`].
pub const WRAP_PLACEHOLDER: &str = "{data}";

/// Pre-processing applied to raw provider data before deserialization.
///
/// Several providers answer with a bare list or scalar at the top level. A message type declares
/// one strategy per format so the generic deserializer always sees an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WrapStrategy {
  /// Leave the data untouched.
  #[default]
  NoWrap,
  /// Substitute the data for [`WRAP_PLACEHOLDER`] in the given template.
  Template(String),
  /// `true` wraps the data in an element/key named after the schema root when needed.
  Wrap(bool),
}

impl WrapStrategy {
  /// Applies this strategy to `data` for `format`, using `root` as the synthetic wrapper name.
  ///
  /// JSON text and trees are only wrapped by `Wrap(true)` when they are not already an object;
  /// XML text is always wrapped (after dropping any `<?xml ...?>` prolog).
  pub fn apply(&self, data: Wire, format: Format, root: &str) -> Wire {
    match (self, data) {
      (Self::NoWrap | Self::Wrap(false), data) => data,
      (Self::Wrap(true), Wire::Tree(tree)) =>
        if tree.is_object() {
          Wire::Tree(tree)
        } else {
          Wire::Tree(json!({ root: tree }))
        },
      (Self::Wrap(true), Wire::Text(text)) => match format {
        Format::Xml => Wire::Text(format!("<{root}>{}</{root}>", strip_xml_prolog(&text))),
        _ =>
          if text.trim_start().starts_with('{') {
            Wire::Text(text)
          } else {
            Wire::Text(format!("{{{}:{}}}", JsonValue::String(root.to_string()), text.trim()))
          },
      },
      (Self::Template(template), Wire::Text(text)) => {
        let text = if format == Format::Xml { strip_xml_prolog(&text) } else { text.trim() };
        Wire::Text(template.replace(WRAP_PLACEHOLDER, text))
      },
      (Self::Template(template), Wire::Tree(tree)) => {
        let rendered = template.replace(WRAP_PLACEHOLDER, &tree.to_string());
        match serde_json::from_str(&rendered) {
          Ok(wrapped) => Wire::Tree(wrapped),
          Err(e) => {
            warn!(template = %template, error = %e, "Wrap template did not produce valid JSON");
            Wire::Tree(tree)
          },
        }
      },
    }
  }
}

/// Wraps `data` for `format` according to `strategy`.
pub fn wrap(data: Wire, format: Format, strategy: &WrapStrategy, root: &str) -> Wire {
  strategy.apply(data, format, root)
}

fn strip_xml_prolog(text: &str) -> &str {
  let trimmed = text.trim();
  if trimmed.starts_with("<?xml") {
    match trimmed.find("?>") {
      Some(end) => trimmed[end + 2..].trim_start(),
      None => trimmed,
    }
  } else {
    trimmed
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_policies() {
    let hash = Format::Hash.policy();
    assert!(!hash.omit_empty() && hash.omit_nil());
    let obj = Format::Obj.policy();
    assert!(!obj.omit_empty() && !obj.omit_nil());
    let xml = Format::Xml.policy();
    assert!(xml.wrap_collections() && xml.xml_attributes());
    assert_eq!(xml.element_name("record_schema", Direction::Render), "recordSchema");
  }

  #[test]
  fn test_key_normalization() {
    let dialect = Format::Json.policy().with_key_transform(NameTransform::Underscore);
    assert!(dialect.normalizes_keys());
    assert_eq!(dialect.normalize_key("DOI"), "doi");
    assert_eq!(dialect.normalize_key("isbn-type"), "isbn_type");
  }

  #[test]
  fn test_wrap_bare_json_list() {
    let wrapped =
      WrapStrategy::Wrap(true).apply(Wire::from(r#"[1, 2]"#), Format::Json, "records");
    let value: JsonValue = serde_json::from_str(wrapped.as_text().unwrap()).unwrap();
    assert_eq!(value, json!({ "records": [1, 2] }));
  }

  #[test]
  fn test_wrap_leaves_objects_alone() {
    let data = Wire::from(r#"{"a": 1}"#);
    assert_eq!(WrapStrategy::Wrap(true).apply(data.clone(), Format::Json, "x"), data);
    assert_eq!(WrapStrategy::NoWrap.apply(data.clone(), Format::Json, "x"), data);
    assert_eq!(WrapStrategy::Wrap(false).apply(data.clone(), Format::Json, "x"), data);
  }

  #[test]
  fn test_wrap_template() {
    let strategy = WrapStrategy::Template(r#"{"status": "ok", "items": {data}}"#.to_string());
    let wrapped = strategy.apply(Wire::from("[\"a\"]"), Format::Json, "ignored");
    let value: JsonValue = serde_json::from_str(wrapped.as_text().unwrap()).unwrap();
    assert_eq!(value, json!({ "status": "ok", "items": ["a"] }));

    let tree = strategy.apply(Wire::Tree(json!(["b"])), Format::Hash, "ignored");
    assert_eq!(tree, Wire::Tree(json!({ "status": "ok", "items": ["b"] })));
  }

  #[test]
  fn test_wrap_xml() {
    let wrapped = WrapStrategy::Wrap(true).apply(
      Wire::from("<?xml version=\"1.0\"?><item>1</item>"),
      Format::Xml,
      "list",
    );
    assert_eq!(wrapped.as_text(), Some("<list><item>1</item></list>"));
  }
}
