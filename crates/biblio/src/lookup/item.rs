use super::*;

/// A provider-agnostic search result, the unit delivered inside envelope `data`.
///
/// # Examples
///
/// ```
/// use biblio::{identifier::Identifier, lookup::LookupItem};
///
/// let mut item = LookupItem::new("crossref").title("Bartleby, the Scrivener").creator("Herman Melville");
/// item.add_identifier(Identifier::parse("doi:10.1000/bartleby")?);
/// item.add_identifier(Identifier::parse("DOI:10.1000/BARTLEBY")?);
/// assert_eq!(item.identifiers.len(), 1);
/// # Ok::<(), biblio::error::BiblioError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupItem {
  /// Provider that returned the item.
  pub service:     String,
  /// Main title (with subtitle, if any).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:       Option<String>,
  /// Authors, editors and other creators in provider order.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub creators:    Vec<String>,
  /// Publisher name.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub publisher:   Option<String>,
  /// Publication date as given by the provider (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date:        Option<String>,
  /// Abstract or description.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Language code.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub language:    Option<String>,
  /// Standard identifiers, de-duplicated, in provider order.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub identifiers: Vec<Identifier>,
  /// Landing page.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub link:        Option<String>,
}

impl LookupItem {
  /// An empty item from `service`.
  pub fn new(service: impl Into<String>) -> Self {
    Self { service: service.into(), ..Self::default() }
  }

  /// Sets the title.
  pub fn title(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }

  /// Appends a creator.
  pub fn creator(mut self, creator: impl Into<String>) -> Self {
    self.creators.push(creator.into());
    self
  }

  /// Adds an identifier unless an equal one is present.
  pub fn add_identifier(&mut self, identifier: Identifier) {
    if !self.identifiers.contains(&identifier) {
      self.identifiers.push(identifier);
    }
  }

  /// Parses `value` as an identifier of `kind` and adds it; malformed values are skipped.
  pub fn add_identifier_value(&mut self, kind: IdentifierKind, value: &str) {
    match Identifier::new(kind, value) {
      Ok(identifier) => self.add_identifier(identifier),
      Err(_) => trace!(service = %self.service, %kind, value, "Skipping malformed identifier"),
    }
  }

  /// Whether the item carries `identifier`.
  pub fn has_identifier(&self, identifier: &Identifier) -> bool {
    self.identifiers.contains(identifier)
  }
}

/// Converts a provider's records into [`LookupItem`]s.
pub trait Normalize: ApiMessage {
  /// One record as an item; `None` when the record carries nothing worth showing.
  fn normalize(&self, record: &Record) -> Option<LookupItem>;

  /// Every record of the message as an item.
  fn items(&self) -> Vec<LookupItem> {
    self.api_records().iter().filter_map(|record| self.normalize(record)).collect()
  }
}

/// Joins a title and an optional subtitle as `title: subtitle`.
pub(crate) fn join_title(title: Option<String>, subtitle: Option<String>) -> Option<String> {
  match (title, subtitle) {
    (Some(title), Some(subtitle)) if !subtitle.is_empty() => Some(format!("{title}: {subtitle}")),
    (title, _) => title,
  }
}
