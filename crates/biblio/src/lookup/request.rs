use super::*;

lazy_static! {
  static ref TERM_PREFIX: Regex = Regex::new(r"^[A-Za-z_.]+$").expect("valid term prefix pattern");
}

/// Prefixes that introduce an identifier URI rather than a search field.
const URI_SCHEMES: [&str; 4] = ["http", "https", "urn", "info"];

/// What a search term searches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKind {
  /// Free text.
  Keyword,
  /// Author or creator name.
  Author,
  /// Title words.
  Title,
  /// Publisher name.
  Publisher,
  /// Subject heading.
  Subject,
  /// A standard identifier.
  Identifier(IdentifierKind),
  /// Any other field; adapters that don't know it drop it with a warning.
  Other(String),
}

impl TermKind {
  /// Maps a `prefix:` to a term kind.
  pub fn from_prefix(prefix: &str) -> Self {
    let prefix = prefix.to_ascii_lowercase();
    match prefix.as_str() {
      "keyword" | "keywords" | "kw" | "q" | "query" => Self::Keyword,
      "author" | "creator" | "au" => Self::Author,
      "title" | "ti" => Self::Title,
      "publisher" | "pb" => Self::Publisher,
      "subject" | "su" => Self::Subject,
      other => match other.parse::<IdentifierKind>() {
        Ok(kind) => Self::Identifier(kind),
        Err(_) => Self::Other(prefix),
      },
    }
  }

  /// The identifier kind, for identifier terms.
  pub fn identifier_kind(&self) -> Option<IdentifierKind> {
    match self {
      Self::Identifier(kind) => Some(*kind),
      _ => None,
    }
  }
}

impl Display for TermKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Keyword => write!(f, "keyword"),
      Self::Author => write!(f, "author"),
      Self::Title => write!(f, "title"),
      Self::Publisher => write!(f, "publisher"),
      Self::Subject => write!(f, "subject"),
      Self::Identifier(kind) => write!(f, "{kind}"),
      Self::Other(name) => write!(f, "{name}"),
    }
  }
}

/// How a term's kind was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
  /// The caller wrote `kind:value`.
  Explicit,
  /// An unprefixed value was recognized as an identifier.
  Detected,
  /// Unprefixed free text.
  Default,
}

/// One typed search term.
///
/// # Examples
///
/// ```
/// use biblio::lookup::{Provenance, SearchTerm, TermKind};
///
/// let term = SearchTerm::parse("author:Melville")?;
/// assert_eq!(term.kind, TermKind::Author);
/// assert_eq!(term.provenance, Provenance::Explicit);
///
/// let isbn = SearchTerm::parse("978-0-14-243724-7")?;
/// assert_eq!(isbn.provenance, Provenance::Detected);
/// assert_eq!(isbn.value, "9780142437247");
///
/// let text = SearchTerm::parse("call me ishmael")?;
/// assert_eq!(text.kind, TermKind::Keyword);
/// # Ok::<(), biblio::error::BiblioError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTerm {
  /// What the term searches on.
  pub kind:       TermKind,
  /// The value; canonical for identifier terms.
  pub value:      String,
  /// How the kind was decided.
  pub provenance: Provenance,
}

impl SearchTerm {
  /// A term of an explicit kind. Identifier values are not normalized here.
  pub fn new(kind: TermKind, value: impl Into<String>) -> Self {
    Self { kind, value: value.into(), provenance: Provenance::Explicit }
  }

  /// Parses `kind:value`, a bare identifier or free text.
  ///
  /// A prefix is only recognized when it is a single word (`author`, `isbn`, `query.title`);
  /// `http:`/`urn:`-style prefixes are treated as identifier URIs.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::InvalidIdentifier`] for an explicitly typed identifier with a malformed
  /// value, and [`BiblioError::InvalidRequest`] for a blank term or a prefix with no value.
  pub fn parse(input: &str) -> Result<Self> {
    let input = input.trim();
    if input.is_empty() {
      return Err(BiblioError::InvalidRequest("blank search term".to_string()));
    }

    if let Some((prefix, value)) = input.split_once(':') {
      let scheme = prefix.to_ascii_lowercase();
      if TERM_PREFIX.is_match(prefix) && !URI_SCHEMES.contains(&scheme.as_str()) {
        let value = value.trim();
        if value.is_empty() {
          return Err(BiblioError::InvalidRequest(format!("no value for '{prefix}:'")));
        }
        let kind = TermKind::from_prefix(prefix);
        let value = match kind.identifier_kind() {
          Some(identifier_kind) => Identifier::new(identifier_kind, value)?.value().to_string(),
          None => value.to_string(),
        };
        return Ok(Self { kind, value, provenance: Provenance::Explicit });
      }
    }

    if let Some(identifier) = Identifier::detect(input) {
      return Ok(Self {
        kind:       TermKind::Identifier(identifier.kind()),
        value:      identifier.value().to_string(),
        provenance: Provenance::Detected,
      });
    }

    Ok(Self { kind: TermKind::Keyword, value: input.to_string(), provenance: Provenance::Default })
  }

  /// The identifier this term carries, if it is an identifier term.
  pub fn identifier(&self) -> Option<Identifier> {
    self.kind.identifier_kind().and_then(|kind| Identifier::new(kind, &self.value).ok())
  }

  /// Whether the term is an identifier term.
  pub fn is_identifier(&self) -> bool { self.kind.identifier_kind().is_some() }
}

impl Display for SearchTerm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind, self.value)
  }
}

impl FromStr for SearchTerm {
  type Err = BiblioError;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

/// Request metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupOptions {
  /// Services to query; `None` selects every enabled service that supports the request.
  pub services: Option<Vec<String>>,
  /// Per-provider timeout overriding each service's configured one.
  pub timeout:  Option<Duration>,
  /// Overall deadline overriding the configured one.
  pub deadline: Option<Duration>,
  /// Requesting user, echoed on envelopes.
  pub user:     Option<String>,
  /// Provider-specific options (`select`, `limit`, `offset`, `schema`, ...).
  pub params:   BTreeMap<String, JsonValue>,
}

impl LookupOptions {
  /// A provider-specific option.
  pub fn param(&self, name: &str) -> Option<&JsonValue> { self.params.get(name) }

  /// A provider-specific option as text (numbers and booleans are rendered).
  pub fn param_text(&self, name: &str) -> Option<String> {
    match self.param(name)? {
      JsonValue::String(s) => Some(s.clone()),
      JsonValue::Number(n) => Some(n.to_string()),
      JsonValue::Bool(b) => Some(b.to_string()),
      _ => None,
    }
  }

  /// A provider-specific option as an unsigned number (numeric strings accepted).
  pub fn param_u64(&self, name: &str) -> Option<u64> {
    match self.param(name)? {
      JsonValue::Number(n) => n.as_u64(),
      JsonValue::String(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  /// Sets a provider-specific option.
  pub fn with_param(mut self, name: impl Into<String>, value: JsonValue) -> Self {
    self.params.insert(name.into(), value);
    self
  }
}

/// A normalized, provider-agnostic lookup request.
///
/// Terms keep the caller's order; a term repeated with the same kind and value is kept once.
///
/// # Examples
///
/// ```
/// use biblio::{identifier::IdentifierKind, lookup::LookupRequest};
///
/// let request = LookupRequest::from_terms(["lccn:n78-890351", "title:Moby Dick", "title:Moby Dick"])?;
/// assert_eq!(request.terms().len(), 2);
/// assert_eq!(request.identifiers_of(IdentifierKind::Lccn), vec!["n78890351"]);
/// # Ok::<(), biblio::error::BiblioError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupRequest {
  terms:       Vec<SearchTerm>,
  /// Request metadata.
  pub options: LookupOptions,
}

impl LookupRequest {
  /// A request from already-typed terms.
  pub fn new(terms: impl IntoIterator<Item = SearchTerm>) -> Self {
    let mut request = Self::default();
    for term in terms {
      request.push(term);
    }
    request
  }

  /// Parses every non-blank term.
  ///
  /// # Errors
  ///
  /// Returns the first [`SearchTerm::parse`] failure.
  pub fn from_terms<I, S>(terms: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>, {
    let terms = terms
      .into_iter()
      .filter(|term| !term.as_ref().trim().is_empty())
      .map(|term| SearchTerm::parse(term.as_ref()))
      .collect::<Result<Vec<_>>>()?;
    Ok(Self::new(terms))
  }

  /// Replaces the options.
  pub fn with_options(mut self, options: LookupOptions) -> Self {
    self.options = options;
    self
  }

  /// Appends a term unless an equal one is already present.
  pub fn push(&mut self, term: SearchTerm) {
    if !self.terms.iter().any(|t| t.kind == term.kind && t.value == term.value) {
      self.terms.push(term);
    }
  }

  /// Terms in request order.
  pub fn terms(&self) -> &[SearchTerm] { &self.terms }

  /// Every identifier in the request.
  pub fn identifiers(&self) -> Vec<Identifier> {
    self.terms.iter().filter_map(SearchTerm::identifier).collect()
  }

  /// Canonical values of the identifiers of `kind`, in request order.
  pub fn identifiers_of(&self, kind: IdentifierKind) -> Vec<String> {
    self
      .terms
      .iter()
      .filter(|term| term.kind == TermKind::Identifier(kind))
      .map(|term| term.value.clone())
      .collect()
  }

  /// Whether every term is an identifier.
  pub fn is_identifier_only(&self) -> bool {
    !self.terms.is_empty() && self.terms.iter().all(SearchTerm::is_identifier)
  }

  /// A provider-specific option.
  pub fn param(&self, name: &str) -> Option<&JsonValue> { self.options.param(name) }

  /// Rejects requests that cannot be sent anywhere.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::InvalidRequest`] when there are no terms.
  pub fn validate(&self) -> Result<()> {
    if self.terms.is_empty() {
      return Err(BiblioError::InvalidRequest(
        "no search terms and no identifiers given".to_string(),
      ));
    }
    Ok(())
  }
}
