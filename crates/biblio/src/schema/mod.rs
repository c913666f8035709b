//! Declarative schemas and the format-policy-driven serializer.
//!
//! A [`Schema`] is an ordered list of [`Field`] declarations. Each field has a symbolic name, a
//! [`FieldKind`] (a scalar, one nested record or many nested records/scalars) and
//! [`RenderOptions`] describing how it appears on the wire. Schemas are registered once through
//! [`SchemaBuilder::build`] (or [`define_schema`]), which rejects repeated names and nested fields
//! whose type has no schema of its own, so mistakes surface at registration time and never when
//! a provider answers.
//!
//! [`serialize`] and [`deserialize`] walk a schema against a [`FormatPolicy`] to map
//! [`Record`]s to and from [`Format::Hash`], [`Format::Json`], [`Format::Xml`] and
//! [`Format::Obj`] data.
//!
//! # Examples
//!
//! ```
//! use biblio::schema::{define_schema, deserialize, serialize, Field, Format, ScalarType, Wire};
//!
//! let author = define_schema("author", vec![Field::text("name"), Field::text("role").attribute()])?;
//! let book = define_schema("book", vec![
//!   Field::text("title").required(),
//!   Field::scalar("pages", ScalarType::Integer),
//!   Field::many_records("author", &author),
//! ])?;
//!
//! let policy = Format::Xml.policy();
//! let wire = Wire::from(
//!   r#"<book><title>Moby Dick</title><pages>635</pages>
//!      <authors><author role="aut"><name>Melville</name></author></authors></book>"#,
//! );
//! let record = deserialize(&book, &wire, &policy);
//! assert_eq!(record.text("title").as_deref(), Some("Moby Dick"));
//! assert_eq!(record.records("author")[0].text("role").as_deref(), Some("aut"));
//!
//! let json = serialize(&record, &Format::Json.policy())?;
//! assert!(json.as_text().unwrap().contains("\"pages\":635"));
//! # Ok::<(), biblio::error::BiblioError>(())
//! ```

use super::*;

mod format;
mod naming;
mod serializer;
pub mod xml;

pub use self::{format::*, naming::*, serializer::*};

/// Shared handle to a registered schema.
pub type SchemaRef = Arc<Schema>;

/// Stricter validation a schema may declare, run by [`Record::validate`].
pub type Validator = fn(&Record) -> std::result::Result<(), String>;

/// Scalar value types a field may declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
  /// Free text.
  Text,
  /// Signed integer.
  Integer,
  /// Floating point number.
  Float,
  /// Boolean (`true`/`false`, `1`/`0`, `yes`/`no` are accepted on input).
  Boolean,
  /// Timestamp (RFC 3339, naive date-time, date or bare year on input).
  DateTime,
  /// Text restricted to a fixed set of values.
  Enumeration(Vec<String>),
}

impl ScalarType {
  /// Builds an enumeration from string slices.
  pub fn enumeration<I, S>(values: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    Self::Enumeration(values.into_iter().map(Into::into).collect())
  }
}

/// Element type of a `many` field.
#[derive(Debug, Clone)]
pub enum Element {
  /// A list of scalars.
  Scalar(ScalarType),
  /// A list of nested records.
  Record(SchemaRef),
}

/// Structural kind of a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
  /// A single scalar value.
  Scalar(ScalarType),
  /// A single nested record.
  One(SchemaRef),
  /// An ordered list of scalars or nested records.
  Many(Element),
}

impl FieldKind {
  /// The nested schema of a `one` or `many`-of-records field.
  pub fn nested_schema(&self) -> Option<&SchemaRef> {
    match self {
      Self::One(schema) | Self::Many(Element::Record(schema)) => Some(schema),
      _ => None,
    }
  }

  /// Whether this is a `many` field.
  pub const fn is_many(&self) -> bool { matches!(self, Self::Many(_)) }

  /// Whether this is a scalar field.
  pub const fn is_scalar(&self) -> bool { matches!(self, Self::Scalar(_)) }
}

/// How a field appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
  /// Explicit wire name, used verbatim instead of the policy's naming transform.
  pub wire_name: Option<String>,
  /// (XML) Render as an attribute of the parent element.
  pub attribute: bool,
  /// (XML) Render as the text content of the parent element.
  pub content:   bool,
  /// (XML) Override the policy's collection wrapping for this field.
  pub wrap:      Option<bool>,
  /// The field is expected to be present. Absence is tolerated on input and never raises.
  pub required:  bool,
}

/// A single named field declaration.
#[derive(Debug, Clone)]
pub struct Field {
  /// Symbolic field name, unique within its schema.
  pub name:   String,
  /// Structural kind.
  pub kind:   FieldKind,
  /// Wire rendering options.
  pub render: RenderOptions,
}

impl Field {
  /// A field of the given kind with default rendering.
  pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
    Self { name: name.into(), kind, render: RenderOptions::default() }
  }

  /// A scalar field.
  pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
    Self::new(name, FieldKind::Scalar(scalar))
  }

  /// A text field.
  pub fn text(name: impl Into<String>) -> Self { Self::scalar(name, ScalarType::Text) }

  /// A single nested record field.
  pub fn one(name: impl Into<String>, schema: &SchemaRef) -> Self {
    Self::new(name, FieldKind::One(Arc::clone(schema)))
  }

  /// A list-of-scalars field.
  pub fn many(name: impl Into<String>, scalar: ScalarType) -> Self {
    Self::new(name, FieldKind::Many(Element::Scalar(scalar)))
  }

  /// A list-of-text field.
  pub fn many_text(name: impl Into<String>) -> Self { Self::many(name, ScalarType::Text) }

  /// A list-of-records field.
  pub fn many_records(name: impl Into<String>, schema: &SchemaRef) -> Self {
    Self::new(name, FieldKind::Many(Element::Record(Arc::clone(schema))))
  }

  /// Uses `name` verbatim on the wire.
  pub fn wire(mut self, name: impl Into<String>) -> Self {
    self.render.wire_name = Some(name.into());
    self
  }

  /// Marks the field as an XML attribute.
  pub fn attribute(mut self) -> Self {
    self.render.attribute = true;
    self
  }

  /// Marks the field as the XML text content of its element.
  pub fn content(mut self) -> Self {
    self.render.content = true;
    self
  }

  /// Forces collection wrapping on or off for this field.
  pub fn wrapped(mut self, wrap: bool) -> Self {
    self.render.wrap = Some(wrap);
    self
  }

  /// Marks the field as required.
  pub fn required(mut self) -> Self {
    self.render.required = true;
    self
  }

  /// Wire name of this element (or JSON key) under `policy`.
  pub fn element_name(&self, policy: &dyn FormatPolicy, direction: Direction) -> String {
    match &self.render.wire_name {
      Some(name) => name.clone(),
      None => policy.element_name(&self.name, direction),
    }
  }

  /// Wire name of this attribute under `policy`.
  pub fn attribute_name(&self, policy: &dyn FormatPolicy, direction: Direction) -> String {
    match &self.render.wire_name {
      Some(name) => name.clone(),
      None => policy.attribute_name(&self.name, direction),
    }
  }

  /// Whether this field renders as an XML attribute under `policy`.
  pub fn is_xml_attribute(&self, policy: &dyn FormatPolicy) -> bool {
    self.render.attribute && policy.xml_attributes()
  }

  /// Whether repeated elements of this field are wrapped in a container under `policy`.
  pub fn is_wrapped(&self, policy: &dyn FormatPolicy) -> bool {
    self.kind.is_many() && self.render.wrap.unwrap_or_else(|| policy.wrap_collections())
  }
}

/// An ordered set of field declarations attached to a record or message type.
#[derive(Clone)]
pub struct Schema {
  name:      String,
  root:      String,
  fields:    Vec<Field>,
  validator: Option<Validator>,
}

impl fmt::Debug for Schema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Schema")
      .field("name", &self.name)
      .field("root", &self.root)
      .field("fields", &self.fields.iter().map(|field| &field.name).collect::<Vec<_>>())
      .field("validator", &self.validator.is_some())
      .finish()
  }
}

impl Schema {
  /// Starts a new schema declaration.
  pub fn builder(name: impl Into<String>) -> SchemaBuilder { SchemaBuilder::new(name) }

  /// Schema name, used in log output and errors.
  pub fn name(&self) -> &str { &self.name }

  /// Name of the root element when this schema is rendered as a document.
  pub fn root(&self) -> &str { &self.root }

  /// Field declarations in declared order.
  pub fn fields(&self) -> &[Field] { &self.fields }

  /// Looks up a field by name.
  pub fn field(&self, name: &str) -> Option<&Field> {
    self.fields.iter().find(|field| field.name == name)
  }

  /// The declared validator, if any.
  pub fn validator(&self) -> Option<Validator> { self.validator }

  /// Starts a schema that aliases `source`: same fields in the same order, under a new name.
  ///
  /// Further fields can be appended before building.
  pub fn derive(name: impl Into<String>, source: &Schema) -> SchemaBuilder {
    let name = name.into();
    SchemaBuilder {
      root: name.clone(),
      name,
      fields: source.fields.clone(),
      validator: source.validator,
    }
  }
}

/// Registration-time builder for a [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
  name:      String,
  root:      String,
  fields:    Vec<Field>,
  validator: Option<Validator>,
}

impl SchemaBuilder {
  /// New, empty declaration. The root element name defaults to `name`.
  pub fn new(name: impl Into<String>) -> Self {
    let name = name.into();
    Self { root: name.clone(), name, fields: Vec::new(), validator: None }
  }

  /// Overrides the root element name.
  pub fn root(mut self, root: impl Into<String>) -> Self {
    self.root = root.into();
    self
  }

  /// Appends a field.
  pub fn field(mut self, field: Field) -> Self {
    self.fields.push(field);
    self
  }

  /// Appends several fields.
  pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
    self.fields.extend(fields);
    self
  }

  /// Declares stricter validation for records of this schema.
  pub fn validator(mut self, validator: Validator) -> Self {
    self.validator = Some(validator);
    self
  }

  /// Validates the declaration and registers the schema.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Schema`] if a field name repeats, a nested field's type has no
  /// fields of its own, or the XML rendering options are contradictory (an attribute that is not
  /// a scalar, an attribute that is also content, or more than one content field).
  pub fn build(self) -> Result<SchemaRef> {
    let mut seen = HashSet::new();
    let mut content_fields = 0;
    for field in &self.fields {
      if !seen.insert(field.name.as_str()) {
        return Err(BiblioError::Schema(format!(
          "field '{}' is declared more than once in {}",
          field.name, self.name
        )));
      }
      if let Some(nested) = field.kind.nested_schema() {
        if nested.fields.is_empty() {
          return Err(BiblioError::Schema(format!(
            "field '{}' of {} refers to {}, which lacks a schema",
            field.name, self.name, nested.name
          )));
        }
      }
      if field.render.attribute && !field.kind.is_scalar() {
        return Err(BiblioError::Schema(format!(
          "field '{}' of {} is an attribute but not a scalar",
          field.name, self.name
        )));
      }
      if field.render.content {
        if field.render.attribute {
          return Err(BiblioError::Schema(format!(
            "field '{}' of {} cannot be both attribute and content",
            field.name, self.name
          )));
        }
        content_fields += 1;
      }
    }
    if content_fields > 1 {
      return Err(BiblioError::Schema(format!("{} declares more than one content field", self.name)));
    }

    trace!(schema = %self.name, fields = self.fields.len(), "Registered schema");
    Ok(Arc::new(Schema {
      name:      self.name,
      root:      self.root,
      fields:    self.fields,
      validator: self.validator,
    }))
  }
}

/// Registers a schema named `name` with the given fields.
///
/// Shorthand for [`Schema::builder`] followed by [`SchemaBuilder::build`].
pub fn define_schema(name: impl Into<String>, fields: Vec<Field>) -> Result<SchemaRef> {
  SchemaBuilder::new(name).fields(fields).build()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn author() -> SchemaRef { define_schema("author", vec![Field::text("name")]).unwrap() }

  #[test]
  fn test_duplicate_field_rejected() {
    let result = define_schema("book", vec![Field::text("title"), Field::text("title")]);
    assert!(matches!(result, Err(BiblioError::Schema(msg)) if msg.contains("more than once")));
  }

  #[test]
  fn test_nested_without_schema_rejected() {
    let empty = Arc::new(Schema {
      name:      "empty".to_string(),
      root:      "empty".to_string(),
      fields:    Vec::new(),
      validator: None,
    });
    let result = define_schema("book", vec![Field::one("thing", &empty)]);
    assert!(matches!(result, Err(BiblioError::Schema(msg)) if msg.contains("lacks a schema")));
  }

  #[test]
  fn test_contradictory_render_options_rejected() {
    let author = author();
    assert!(define_schema("a", vec![Field::one("author", &author).attribute()]).is_err());
    assert!(define_schema("b", vec![Field::text("x").attribute().content()]).is_err());
    assert!(define_schema("c", vec![Field::text("x").content(), Field::text("y").content()])
      .is_err());
  }

  #[test]
  fn test_derive_preserves_order() {
    let source = define_schema("source", vec![
      Field::text("title"),
      Field::text("subtitle"),
      Field::many_records("author", &author()),
    ])
    .unwrap();
    let derived = Schema::derive("alias", &source).field(Field::text("note")).build().unwrap();

    let names: Vec<_> = derived.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["title", "subtitle", "author", "note"]);
    assert_eq!(derived.name(), "alias");
    assert_eq!(derived.root(), "alias");
  }

  #[test]
  fn test_wire_name_override_is_verbatim() {
    let field = Field::text("identifier").wire("dc:identifier");
    let policy = Format::Xml.policy();
    assert_eq!(field.element_name(&policy, Direction::Render), "dc:identifier");
    let plain = Field::text("record_schema");
    assert_eq!(plain.element_name(&policy, Direction::Parse), "recordSchema");
  }

  #[test]
  fn test_wrapping_follows_policy_unless_overridden() {
    let xml = Format::Xml.policy();
    assert!(Field::many_text("subject").is_wrapped(&xml));
    assert!(!Field::many_text("subject").wrapped(false).is_wrapped(&xml));
    assert!(!Field::text("title").is_wrapped(&xml));
    assert!(!Field::many_text("subject").is_wrapped(&Format::Json.policy()));
  }
}
