//! Typed standard bibliographic identifiers.
//!
//! An [`Identifier`] pairs an [`IdentifierKind`] with a canonical value. Parsing normalizes the
//! value (hyphens, prefixes, check digits, LCCN zero padding) so equality, hashing and
//! de-duplication all work on `(kind, normalized value)`.
//!
//! # Examples
//!
//! ```
//! use biblio::identifier::{Identifier, IdentifierKind};
//!
//! let isbn = Identifier::parse("isbn:0-14-243724-7")?;
//! assert_eq!(isbn.kind(), IdentifierKind::Isbn);
//! assert_eq!(isbn.value(), "9780142437247");
//! assert_eq!(isbn, Identifier::parse("ISBN:978-0-14-243724-7")?);
//!
//! let lccn = Identifier::parse("lccn:n78-890351")?;
//! assert_eq!(lccn.to_string(), "lccn:n78890351");
//!
//! let doi = Identifier::detect("https://doi.org/10.1000/XYZ123").unwrap();
//! assert_eq!(doi.to_string(), "doi:10.1000/xyz123");
//! # Ok::<(), biblio::error::BiblioError>(())
//! ```

use super::*;

lazy_static! {
  static ref DOI: Regex = Regex::new(r"^10\.\d{4,9}/\S+$").expect("valid DOI pattern");
  static ref ISSN: Regex = Regex::new(r"^(\d{4})-?(\d{3}[\dXx])$").expect("valid ISSN pattern");
  static ref OCLC: Regex =
    Regex::new(r"^(?:\(OCoLC\))?(?:ocm|ocn|on)?0*(\d+)$").expect("valid OCLC pattern");
  static ref LCCN: Regex = Regex::new(r"^([a-z]{0,3})(\d{2}|\d{4})(\d{1,6})$").expect("valid LCCN");
  static ref UPC: Regex = Regex::new(r"^\d{12}$").expect("valid UPC pattern");
}

/// Kinds of standard identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
  /// International Standard Book Number (canonicalized to ISBN-13).
  Isbn,
  /// International Standard Serial Number.
  Issn,
  /// OCLC control number.
  Oclc,
  /// Library of Congress Control Number.
  Lccn,
  /// Digital Object Identifier.
  Doi,
  /// Universal Product Code.
  Upc,
}

impl IdentifierKind {
  /// All kinds, in display order.
  pub const ALL: [Self; 6] = [Self::Isbn, Self::Issn, Self::Oclc, Self::Lccn, Self::Doi, Self::Upc];

  /// Lower-case prefix used in `kind:value` form.
  pub const fn prefix(self) -> &'static str {
    match self {
      Self::Isbn => "isbn",
      Self::Issn => "issn",
      Self::Oclc => "oclc",
      Self::Lccn => "lccn",
      Self::Doi => "doi",
      Self::Upc => "upc",
    }
  }
}

impl Display for IdentifierKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.prefix()) }
}

impl FromStr for IdentifierKind {
  type Err = BiblioError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "isbn" => Ok(Self::Isbn),
      "issn" => Ok(Self::Issn),
      "oclc" | "oclcnum" => Ok(Self::Oclc),
      "lccn" => Ok(Self::Lccn),
      "doi" => Ok(Self::Doi),
      "upc" => Ok(Self::Upc),
      other => Err(BiblioError::InvalidIdentifier(format!("unknown identifier type '{other}'"))),
    }
  }
}

/// A normalized standard identifier. Serialized as its `kind:value` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Identifier {
  kind:  IdentifierKind,
  value: String,
}

impl Identifier {
  /// Builds an identifier of `kind`, normalizing `value`.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::InvalidIdentifier`] if the value is not a well-formed identifier of
  /// that kind (including a failed ISBN/ISSN check digit).
  pub fn new(kind: IdentifierKind, value: &str) -> Result<Self> {
    let invalid = || BiblioError::InvalidIdentifier(format!("{kind}:{value}"));
    let value = match kind {
      IdentifierKind::Isbn => normalize_isbn(value).ok_or_else(invalid)?,
      IdentifierKind::Issn => normalize_issn(value).ok_or_else(invalid)?,
      IdentifierKind::Oclc => normalize_oclc(value).ok_or_else(invalid)?,
      IdentifierKind::Lccn => normalize_lccn(value).ok_or_else(invalid)?,
      IdentifierKind::Doi => normalize_doi(value).ok_or_else(invalid)?,
      IdentifierKind::Upc => {
        let digits = strip_separators(value);
        if !UPC.is_match(&digits) {
          return Err(invalid());
        }
        digits
      },
    };
    Ok(Self { kind, value })
  }

  /// Parses a `kind:value` form.
  ///
  /// Besides `isbn:...`-style prefixes (case-insensitive), accepts `urn:isbn:...`,
  /// `info:oclcnum/...` and DOI resolver URLs.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::InvalidIdentifier`] when there is no recognizable prefix or the value
  /// is malformed.
  pub fn parse(input: &str) -> Result<Self> {
    let input = input.trim();
    let lower = input.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("urn:") {
      let offset = input.len() - rest.len();
      return Self::parse(&input[offset..]);
    }
    if let Some(rest) = lower.strip_prefix("info:oclcnum/") {
      return Self::new(IdentifierKind::Oclc, &input[input.len() - rest.len()..]);
    }
    if lower.starts_with("http://") || lower.starts_with("https://") {
      return Self::new(IdentifierKind::Doi, input);
    }
    let (prefix, value) = input
      .split_once(':')
      .ok_or_else(|| BiblioError::InvalidIdentifier(format!("missing type prefix: {input}")))?;
    Self::new(prefix.parse()?, value)
  }

  /// Guesses the kind of an unprefixed value.
  ///
  /// Recognizes DOIs (`10.NNNN/...` and resolver URLs), ISBN-10/13 with a valid check digit,
  /// ISSNs in `NNNN-NNNX` form and OCLC numbers with an `ocm`/`ocn`/`on` prefix. Anything else
  /// (including bare digit strings that are not ISBNs) is `None`.
  pub fn detect(input: &str) -> Option<Self> {
    let input = input.trim();
    if let Ok(identifier) = Self::parse(input) {
      return Some(identifier);
    }
    let lower = input.to_ascii_lowercase();
    if DOI.is_match(&lower) {
      return Self::new(IdentifierKind::Doi, input).ok();
    }
    if lower.starts_with("ocm") || lower.starts_with("ocn") || lower.starts_with("on") {
      if let Ok(identifier) = Self::new(IdentifierKind::Oclc, input) {
        return Some(identifier);
      }
    }
    if input.contains('-') && ISSN.is_match(input) {
      if let Ok(identifier) = Self::new(IdentifierKind::Issn, input) {
        return Some(identifier);
      }
    }
    Self::new(IdentifierKind::Isbn, input).ok()
  }

  /// The identifier kind.
  pub fn kind(&self) -> IdentifierKind { self.kind }

  /// The canonical value.
  pub fn value(&self) -> &str { &self.value }
}

impl Display for Identifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind, self.value)
  }
}

impl FromStr for Identifier {
  type Err = BiblioError;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl From<Identifier> for String {
  fn from(identifier: Identifier) -> Self { identifier.to_string() }
}

impl TryFrom<String> for Identifier {
  type Error = BiblioError;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

fn strip_separators(value: &str) -> String {
  value.chars().filter(|c| !matches!(c, '-' | ' ' | '\u{2010}')).collect()
}

/// Strips separators, verifies the check digit and converts ISBN-10 to ISBN-13.
pub fn normalize_isbn(value: &str) -> Option<String> {
  let isbn = strip_separators(value).to_ascii_uppercase();
  match isbn.len() {
    10 if is_valid_isbn10(&isbn) => Some(isbn10_to_isbn13(&isbn)),
    13 if is_valid_isbn13(&isbn) => Some(isbn),
    _ => None,
  }
}

fn is_valid_isbn10(isbn: &str) -> bool {
  let mut sum = 0;
  for (index, c) in isbn.chars().enumerate() {
    let digit = match (index, c) {
      (9, 'X') => 10,
      (_, c) => match c.to_digit(10) {
        Some(d) => d,
        None => return false,
      },
    };
    sum += digit * (10 - index as u32);
  }
  sum % 11 == 0
}

fn is_valid_isbn13(isbn: &str) -> bool {
  let digits: Option<Vec<u32>> = isbn.chars().map(|c| c.to_digit(10)).collect();
  let Some(digits) = digits else { return false };
  let sum: u32 = digits
    .iter()
    .enumerate()
    .map(|(index, d)| if index % 2 == 0 { *d } else { d * 3 })
    .sum();
  sum % 10 == 0
}

fn isbn10_to_isbn13(isbn10: &str) -> String {
  let stem = format!("978{}", &isbn10[..9]);
  let sum: u32 = stem
    .chars()
    .filter_map(|c| c.to_digit(10))
    .enumerate()
    .map(|(index, d)| if index % 2 == 0 { d } else { d * 3 })
    .sum();
  format!("{stem}{}", (10 - sum % 10) % 10)
}

fn normalize_issn(value: &str) -> Option<String> {
  let captures = ISSN.captures(value.trim())?;
  let issn = format!("{}{}", &captures[1], &captures[2]).to_ascii_uppercase();
  let sum: u32 = issn[..7]
    .chars()
    .filter_map(|c| c.to_digit(10))
    .enumerate()
    .map(|(index, d)| d * (8 - index as u32))
    .sum();
  let check = match (11 - sum % 11) % 11 {
    10 => 'X',
    n => char::from_digit(n, 10)?,
  };
  issn.ends_with(check).then(|| format!("{}-{}", &issn[..4], &issn[4..]))
}

fn normalize_oclc(value: &str) -> Option<String> {
  let captures = OCLC.captures(value.trim())?;
  let number = &captures[1];
  Some(if number.is_empty() { "0".to_string() } else { number.to_string() })
}

/// Library of Congress normalization: drop blanks and any `/` suffix, then zero-pad the serial
/// after a hyphen to six digits.
pub fn normalize_lccn(value: &str) -> Option<String> {
  let mut lccn: String = value.chars().filter(|c| !c.is_whitespace()).collect();
  if let Some(slash) = lccn.find('/') {
    lccn.truncate(slash);
  }
  let lccn = lccn.to_ascii_lowercase();
  let lccn = match lccn.split_once('-') {
    Some((head, serial)) if !serial.is_empty() && serial.chars().all(|c| c.is_ascii_digit()) =>
      format!("{head}{serial:0>6}"),
    Some(_) => return None,
    None => lccn,
  };
  LCCN.is_match(&lccn).then_some(lccn)
}

fn normalize_doi(value: &str) -> Option<String> {
  let mut doi = value.trim().to_ascii_lowercase();
  for prefix in ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/"]
  {
    if let Some(rest) = doi.strip_prefix(prefix) {
      doi = rest.to_string();
    }
  }
  if let Some(rest) = doi.strip_prefix("doi:") {
    doi = rest.trim().to_string();
  }
  DOI.is_match(&doi).then_some(doi)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_isbn_normalization() {
    let isbn = Identifier::new(IdentifierKind::Isbn, "0-14-243724-7").unwrap();
    assert_eq!(isbn.value(), "9780142437247");
    assert_eq!(Identifier::new(IdentifierKind::Isbn, "080442957X").unwrap().value(), "9780804429573");
    assert!(Identifier::new(IdentifierKind::Isbn, "0-14-243724-8").is_err());
  }

  #[test]
  fn test_issn_normalization() {
    assert_eq!(Identifier::new(IdentifierKind::Issn, "03785955").unwrap().value(), "0378-5955");
    assert_eq!(Identifier::new(IdentifierKind::Issn, "2434-561x").unwrap().value(), "2434-561X");
    assert!(Identifier::new(IdentifierKind::Issn, "0378-5954").is_err());
  }

  #[test]
  fn test_oclc_normalization() {
    assert_eq!(Identifier::parse("oclc:ocm00012345").unwrap().value(), "12345");
    assert_eq!(Identifier::parse("info:oclcnum/ocn123456789").unwrap().value(), "123456789");
    assert_eq!(Identifier::parse("oclc:(OCoLC)0042").unwrap().value(), "42");
  }

  #[test]
  fn test_lccn_normalization() {
    assert_eq!(normalize_lccn("n78-890351").as_deref(), Some("n78890351"));
    assert_eq!(normalize_lccn("n78-89035").as_deref(), Some("n78089035"));
    assert_eq!(normalize_lccn(" 85-2 ").as_deref(), Some("85000002"));
    assert_eq!(normalize_lccn("75-425165//r75").as_deref(), Some("75425165"));
    assert_eq!(normalize_lccn("0123456").as_deref(), Some("0123456"));
    assert!(normalize_lccn("not an lccn").is_none());
  }

  #[test]
  fn test_doi_normalization() {
    let doi = Identifier::parse("doi:10.1000/ABC").unwrap();
    assert_eq!(doi.value(), "10.1000/abc");
    assert_eq!(Identifier::parse("https://dx.doi.org/10.1000/abc").unwrap(), doi);
  }

  #[test]
  fn test_detect() {
    assert_eq!(Identifier::detect("9780142437247").unwrap().kind(), IdentifierKind::Isbn);
    assert_eq!(Identifier::detect("10.1145/1327452.1327492").unwrap().kind(), IdentifierKind::Doi);
    assert_eq!(Identifier::detect("0378-5955").unwrap().kind(), IdentifierKind::Issn);
    assert_eq!(Identifier::detect("ocm12345").unwrap().kind(), IdentifierKind::Oclc);
    assert_eq!(Identifier::detect("urn:ISBN:0-14-243724-7").unwrap().kind(), IdentifierKind::Isbn);
    assert!(Identifier::detect("moby dick").is_none());
    assert!(Identifier::detect("12345").is_none());
  }

  #[test]
  fn test_dedup_by_kind_and_value() {
    let ids: HashSet<Identifier> = ["isbn:0142437247", "isbn:978-0-14-243724-7", "oclc:ocm42"]
      .into_iter()
      .map(|s| Identifier::parse(s).unwrap())
      .collect();
    assert_eq!(ids.len(), 2);
  }

  #[test]
  fn test_serializes_as_string() {
    let isbn = Identifier::parse("isbn:0142437247").unwrap();
    assert_eq!(serde_json::to_value(&isbn).unwrap(), json!("isbn:9780142437247"));
    let back: Identifier = serde_json::from_value(json!("isbn:9780142437247")).unwrap();
    assert_eq!(back, isbn);
  }

  #[test]
  fn test_unknown_prefix() {
    assert!(matches!(
      Identifier::parse("asin:B000"),
      Err(BiblioError::InvalidIdentifier(msg)) if msg.contains("asin")
    ));
  }
}
