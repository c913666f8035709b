//! Wire-name transformations applied by format policies.

use super::*;

/// A transformation between a schema field name and the name used on the wire.
///
/// Field names are declared in `snake_case`; each policy picks the transform its wire dialect
/// needs, independently for elements and attributes and for the parse and render directions.
///
/// # Examples
///
/// ```
/// use biblio::schema::NameTransform;
///
/// assert_eq!(NameTransform::LowerCamel.apply("total_items"), "totalItems");
/// assert_eq!(NameTransform::Dasherize.apply("isbn_type"), "isbn-type");
/// assert_eq!(NameTransform::Underscore.apply("DOI"), "doi");
/// assert_eq!(NameTransform::Underscore.apply("container-title"), "container_title");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameTransform {
  /// Leave the name untouched.
  #[default]
  Identity,
  /// `total_items` → `totalItems`
  LowerCamel,
  /// `total_items` → `TotalItems`
  UpperCamel,
  /// `totalItems`, `container-title`, `DOI` → `total_items`, `container_title`, `doi`
  Underscore,
  /// `isbn_type` → `isbn-type`
  Dasherize,
}

impl NameTransform {
  /// Applies this transform to `name`.
  pub fn apply(self, name: &str) -> String {
    match self {
      Self::Identity => name.to_string(),
      Self::LowerCamel => camelize(name, false),
      Self::UpperCamel => camelize(name, true),
      Self::Underscore => underscore(name),
      Self::Dasherize => underscore(name).replace('_', "-"),
    }
  }
}

fn camelize(name: &str, upper_first: bool) -> String {
  let mut result = String::with_capacity(name.len());
  let mut upper_next = upper_first;
  for (index, c) in name.chars().enumerate() {
    if c == '_' || c == '-' {
      upper_next = index > 0 || upper_first;
      continue;
    }
    if upper_next {
      result.extend(c.to_uppercase());
      upper_next = false;
    } else if index == 0 && !upper_first {
      result.extend(c.to_lowercase());
    } else {
      result.push(c);
    }
  }
  result
}

/// Rails-style underscoring: acronym runs stay together (`HTMLParser` → `html_parser`).
fn underscore(name: &str) -> String {
  let chars: Vec<char> = name.chars().collect();
  let mut result = String::with_capacity(name.len() + 4);
  for (index, &c) in chars.iter().enumerate() {
    if c == '-' || c == ' ' {
      result.push('_');
      continue;
    }
    if c.is_uppercase() && index > 0 {
      let prev = chars[index - 1];
      let next_is_lower = chars.get(index + 1).is_some_and(|n| n.is_lowercase());
      let boundary = prev.is_lowercase()
        || prev.is_ascii_digit()
        || (prev.is_uppercase() && next_is_lower);
      if boundary && !result.ends_with('_') {
        result.push('_');
      }
    }
    result.extend(c.to_lowercase());
  }
  result
}

/// English plural used for collection wrapper elements (`identifier` → `identifiers`).
pub fn pluralize(name: &str) -> String {
  let lower = name.to_ascii_lowercase();
  if lower.ends_with('y')
    && !matches!(lower.chars().rev().nth(1), Some('a' | 'e' | 'i' | 'o' | 'u'))
    && name.len() > 1
  {
    format!("{}ies", &name[..name.len() - 1])
  } else if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
    format!("{name}es")
  } else {
    format!("{name}s")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_camelize() {
    assert_eq!(NameTransform::LowerCamel.apply("volume_info"), "volumeInfo");
    assert_eq!(NameTransform::LowerCamel.apply("title"), "title");
    assert_eq!(NameTransform::UpperCamel.apply("volume_info"), "VolumeInfo");
    assert_eq!(NameTransform::LowerCamel.apply("industry_identifiers"), "industryIdentifiers");
  }

  #[test]
  fn test_underscore() {
    assert_eq!(NameTransform::Underscore.apply("totalItems"), "total_items");
    assert_eq!(NameTransform::Underscore.apply("DOI"), "doi");
    assert_eq!(NameTransform::Underscore.apply("ISBN"), "isbn");
    assert_eq!(NameTransform::Underscore.apply("isbn-type"), "isbn_type");
    assert_eq!(NameTransform::Underscore.apply("HTMLParser"), "html_parser");
    assert_eq!(NameTransform::Underscore.apply("already_snake"), "already_snake");
  }

  #[test]
  fn test_dasherize() {
    assert_eq!(NameTransform::Dasherize.apply("published_print"), "published-print");
    assert_eq!(NameTransform::Dasherize.apply("isReferencedByCount"), "is-referenced-by-count");
  }

  #[test]
  fn test_pluralize() {
    assert_eq!(pluralize("identifier"), "identifiers");
    assert_eq!(pluralize("entry"), "entries");
    assert_eq!(pluralize("key"), "keys");
    assert_eq!(pluralize("box"), "boxes");
    assert_eq!(pluralize("address"), "addresses");
  }
}
