//! XML documents as generic key/value trees.
//!
//! The deserializer works on a single tree shape for every format. XML is brought into that
//! shape by [`to_tree`]:
//!
//! - attributes become keys prefixed with `@` (`<entry id="1">` → `{"@id": "1"}`)
//! - text content becomes a `$text` key, or the element's whole value when it has no attributes
//!   or children
//! - repeated child elements become arrays, in document order
//! - text is kept as written; whitespace between child elements is dropped
//! - a self-closing element (`<x/>`) becomes `null`, an open/close pair with nothing inside
//!   (`<x></x>`) becomes the empty string
//!
//! Namespace prefixes are kept as part of the name (`dc:identifier`), so schemas for namespaced
//! dialects declare their wire names verbatim.

use quick_xml::{events::Event, Reader};

use super::*;

/// Key under which an element's text content is stored.
pub const TEXT_KEY: &str = "$text";

/// Prefix marking attribute keys.
pub const ATTRIBUTE_PREFIX: char = '@';

/// Converts an XML document into a key/value tree rooted at the document element.
///
/// Never fails: malformed input is logged and the elements parsed up to the error are kept, with
/// any unclosed elements closed implicitly.
///
/// # Examples
///
/// ```
/// use biblio::schema::xml::to_tree;
/// use serde_json::json;
///
/// let tree = to_tree(r#"<feed><entry id="1">A</entry><entry id="2">B</entry></feed>"#);
/// assert_eq!(
///   tree,
///   json!({ "feed": { "entry": [{ "@id": "1", "$text": "A" }, { "@id": "2", "$text": "B" }] } })
/// );
/// ```
pub fn to_tree(xml: &str) -> JsonValue {
  let mut reader = Reader::from_str(xml);

  let mut stack: Vec<(String, Map<String, JsonValue>)> = Vec::new();
  let mut current = Map::new();

  loop {
    match reader.read_event() {
      Ok(Event::Start(ref e)) => {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut element = attributes(e);
        // An open tag always has content, even if it turns out to be empty.
        element.insert(TEXT_KEY.to_string(), JsonValue::String(String::new()));
        let parent = std::mem::replace(&mut current, element);
        stack.push((tag, parent));
      },
      Ok(Event::Empty(ref e)) => {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let element = attributes(e);
        let value = if element.is_empty() { JsonValue::Null } else { JsonValue::Object(element) };
        insert_child(&mut current, tag, value);
      },
      Ok(Event::Text(e)) => match e.unescape() {
        Ok(text) => append_text(&mut current, &text),
        Err(err) => {
          debug!(error = %err, "Could not unescape XML text, keeping it raw");
          append_text(&mut current, &String::from_utf8_lossy(e.as_ref()));
        },
      },
      Ok(Event::CData(e)) => append_text(&mut current, &String::from_utf8_lossy(&e.into_inner())),
      Ok(Event::End(_)) =>
        if let Some((tag, mut parent)) = stack.pop() {
          insert_child(&mut parent, tag, finish(current));
          current = parent;
        },
      Ok(Event::Eof) => break,
      Ok(_) => (),
      Err(e) => {
        warn!(
          position = reader.buffer_position(),
          error = %e,
          "Malformed XML, keeping the elements parsed so far"
        );
        break;
      },
    }
  }

  while let Some((tag, mut parent)) = stack.pop() {
    insert_child(&mut parent, tag, finish(current));
    current = parent;
  }

  JsonValue::Object(settle(current))
}

/// Returns the value of a tree's single root element (the tree itself if it has several keys).
pub fn unwrap_root(tree: JsonValue) -> JsonValue {
  match tree {
    JsonValue::Object(mut map) if map.len() == 1 => match map.keys().next().cloned() {
      Some(key) => map.remove(&key).unwrap_or(JsonValue::Null),
      None => JsonValue::Object(map),
    },
    other => other,
  }
}

/// The text of a tree node: the node itself if it is a string, or its `$text` entry.
pub fn text_of(value: &JsonValue) -> Option<&str> {
  match value {
    JsonValue::String(text) => Some(text),
    JsonValue::Object(map) => map.get(TEXT_KEY).and_then(JsonValue::as_str),
    _ => None,
  }
}

fn attributes(e: &quick_xml::events::BytesStart<'_>) -> Map<String, JsonValue> {
  let mut map = Map::new();
  for attr in e.attributes().flatten() {
    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
    match attr.unescape_value() {
      Ok(value) => {
        map.insert(format!("{ATTRIBUTE_PREFIX}{key}"), JsonValue::String(value.into_owned()));
      },
      Err(e) => debug!(attribute = %key, error = %e, "Skipping undecodable XML attribute"),
    }
  }
  map
}

fn append_text(current: &mut Map<String, JsonValue>, text: &str) {
  match current.get_mut(TEXT_KEY) {
    Some(JsonValue::String(existing)) => existing.push_str(text),
    _ => {
      current.insert(TEXT_KEY.to_string(), JsonValue::String(text.to_string()));
    },
  }
}

/// Drops layout whitespace around child elements. Text of leaf elements is left untouched.
fn settle(mut element: Map<String, JsonValue>) -> Map<String, JsonValue> {
  let has_children = element.keys().any(|key| key != TEXT_KEY && !key.starts_with(ATTRIBUTE_PREFIX));
  if let Some(JsonValue::String(text)) = element.get(TEXT_KEY) {
    if has_children {
      let trimmed = text.trim().to_string();
      if trimmed.is_empty() {
        element.remove(TEXT_KEY);
      } else {
        element.insert(TEXT_KEY.to_string(), JsonValue::String(trimmed));
      }
    }
  }
  element
}

/// Simplifies a finished element: text-only elements collapse to their text.
fn finish(element: Map<String, JsonValue>) -> JsonValue {
  let mut element = settle(element);
  if element.is_empty() {
    JsonValue::Null
  } else if element.len() == 1 && element.contains_key(TEXT_KEY) {
    element.remove(TEXT_KEY).unwrap_or(JsonValue::Null)
  } else {
    JsonValue::Object(element)
  }
}

fn insert_child(parent: &mut Map<String, JsonValue>, tag: String, value: JsonValue) {
  match parent.get_mut(&tag) {
    Some(JsonValue::Array(items)) => items.push(value),
    Some(existing) => {
      let first = existing.take();
      *existing = JsonValue::Array(vec![first, value]);
    },
    None => {
      parent.insert(tag, value);
    },
  }
}
