//! Google Books volumes API adapter.
//!
//! Every search term becomes one token of the `q` parameter (`intitle:`, `inauthor:`, `isbn:`,
//! ...). Google matches LCCN searches but does not list the LCCN among a volume's
//! `industryIdentifiers`, so searched LCCNs are put back at the front of each result's
//! identifiers after parsing.

use super::*;
use crate::lookup::{join_title, LookupAdapter, LookupItem, LookupReply, LookupRequest, Normalize, TermKind};

/// Industry identifier type Google would use for an LCCN.
const LCCN_TYPE: &str = "LCCN";

lazy_static! {
  /// `{type, identifier}`
  pub static ref INDUSTRY_IDENTIFIER: SchemaRef =
    define_schema("google_industry_identifier", vec![Field::text("type"), Field::text("identifier")])
      .expect("valid industry identifier schema");

  static ref IMAGE_LINKS: SchemaRef =
    define_schema("google_image_links", vec![Field::text("small_thumbnail"), Field::text("thumbnail")])
      .expect("valid image links schema");

  /// Bibliographic part of a volume.
  pub static ref VOLUME_INFO: SchemaRef = define_schema("google_volume_info", vec![
    Field::text("title"),
    Field::text("subtitle"),
    Field::many_text("authors"),
    Field::text("publisher"),
    Field::text("published_date"),
    Field::text("description"),
    Field::many_records("industry_identifiers", &INDUSTRY_IDENTIFIER),
    Field::scalar("page_count", ScalarType::Integer),
    Field::text("print_type"),
    Field::many_text("categories"),
    Field::scalar("average_rating", ScalarType::Float),
    Field::scalar("ratings_count", ScalarType::Integer),
    Field::text("maturity_rating"),
    Field::text("language"),
    Field::text("preview_link"),
    Field::text("info_link"),
    Field::text("canonical_volume_link"),
    Field::one("image_links", &IMAGE_LINKS),
  ])
  .expect("valid volume info schema");

  static ref VOLUME: SchemaRef = define_schema("google_volume", vec![
    Field::text("kind"),
    Field::text("id"),
    Field::text("etag"),
    Field::text("self_link"),
    Field::one("volume_info", &VOLUME_INFO),
  ])
  .expect("valid volume schema");

  static ref VOLUMES: MessageType = MessageType::new(
    &define_schema("google_volumes", vec![
      Field::text("kind"),
      Field::scalar("total_items", ScalarType::Integer),
      Field::many_records("items", &VOLUME),
    ])
    .expect("valid volumes schema"),
  );
}

/// A volumes search response.
#[derive(Debug, Clone)]
pub struct GoogleBooksMessage {
  message: Message,
}

impl GoogleBooksMessage {
  /// `totalItems`
  pub fn total_items(&self) -> Option<i64> { self.message.record.integer("total_items") }

  /// Puts every searched LCCN missing from a volume's identifiers at the front of that list,
  /// keeping the searched order.
  pub fn inject_lccns(&mut self, lccns: &[String]) {
    if lccns.is_empty() {
      return;
    }
    let Some(Value::List(volumes)) = self.message.record.get_mut("items") else { return };
    for volume in volumes.iter_mut().filter_map(Value::as_record_mut) {
      let Some(info) = volume.get_mut("volume_info").and_then(Value::as_record_mut) else { continue };
      let mut identifiers: Vec<Value> = match info.remove("industry_identifiers") {
        Some(Value::List(identifiers)) => identifiers,
        _ => Vec::new(),
      };
      let present: Vec<String> = identifiers
        .iter()
        .filter_map(Value::as_record)
        .filter_map(|identifier| identifier.text("identifier"))
        .map(|value| normalize_lccn(&value).unwrap_or(value))
        .collect();
      let missing: Vec<Value> = lccns
        .iter()
        .filter(|lccn| !present.contains(lccn))
        .filter_map(|lccn| {
          Record::new(&INDUSTRY_IDENTIFIER)
            .with("type", LCCN_TYPE)
            .and_then(|record| record.with("identifier", lccn.as_str()))
            .ok()
            .map(Value::Record)
        })
        .collect();
      if !missing.is_empty() {
        trace!(count = missing.len(), "Re-injecting searched LCCNs");
      }
      identifiers.splice(0..0, missing);
      if let Err(error) = info.set("industry_identifiers", Value::List(identifiers)) {
        warn!(error = %error, "Could not restore industry identifiers");
      }
    }
  }
}

impl ApiMessage for GoogleBooksMessage {
  fn message(&self) -> &Message { &self.message }

  fn api_records(&self) -> Vec<Record> {
    self.message.record.records("items").into_iter().cloned().collect()
  }
}

impl Normalize for GoogleBooksMessage {
  fn normalize(&self, volume: &Record) -> Option<LookupItem> {
    let info = volume.record("volume_info")?;
    let mut item = LookupItem::new(&self.message.service);
    item.title = join_title(info.text("title"), info.text("subtitle"));
    item.creators = info.texts("authors");
    item.publisher = info.text("publisher");
    item.date = info.text("published_date");
    item.description = info.text("description");
    item.language = info.text("language");
    item.link = info.text("canonical_volume_link").or_else(|| info.text("info_link"));
    for identifier in info.records("industry_identifiers") {
      let Some(value) = identifier.text("identifier") else { continue };
      let kind = match identifier.text("type").as_deref() {
        Some("ISBN_10" | "ISBN_13") => IdentifierKind::Isbn,
        Some("ISSN") => IdentifierKind::Issn,
        Some(LCCN_TYPE) => IdentifierKind::Lccn,
        Some("OCLC") => IdentifierKind::Oclc,
        _ => continue,
      };
      item.add_identifier_value(kind, &value);
    }
    Some(item)
  }
}

/// Google Books adapter.
#[derive(Debug, Clone)]
pub struct GoogleBooksService {
  client:  HttpClient,
  dialect: Dialect,
}

impl GoogleBooksService {
  /// Builds the adapter.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Network`] if the HTTP client cannot be created.
  pub fn new(settings: ServiceSettings) -> Result<Self> {
    let dialect = Dialect::for_format(Format::Json).with_elements(NameTransform::LowerCamel);
    Ok(Self { client: HttpClient::new(settings)?, dialect })
  }

  /// Translates a request into volumes query parameters.
  ///
  /// # Examples
  ///
  /// ```
  /// use biblio::{
  ///   configuration::ServiceSettings,
  ///   lookup::LookupRequest,
  ///   service::google_books::GoogleBooksService,
  /// };
  ///
  /// let google = GoogleBooksService::new(ServiceSettings::new("google_books", "https://www.googleapis.com"))?;
  /// let request = LookupRequest::from_terms(["title:Moby Dick", "author:Melville", "whale"])?;
  /// let params = google.build_query(&request);
  /// assert_eq!(params.get("q"), Some(r#"intitle:"Moby Dick" inauthor:Melville whale"#));
  /// # Ok::<(), biblio::error::BiblioError>(())
  /// ```
  pub fn build_query(&self, request: &LookupRequest) -> QueryParams {
    let mut tokens = Vec::new();
    for term in request.terms() {
      let prefix = match &term.kind {
        TermKind::Keyword => {
          tokens.push(term.value.clone());
          continue;
        },
        TermKind::Title => "intitle",
        TermKind::Author => "inauthor",
        TermKind::Publisher => "inpublisher",
        TermKind::Subject => "subject",
        TermKind::Identifier(IdentifierKind::Isbn) => "isbn",
        TermKind::Identifier(IdentifierKind::Lccn) => "lccn",
        TermKind::Identifier(IdentifierKind::Oclc) => "oclc",
        other => {
          warn!(service = GOOGLE_BOOKS, field = %other, "Unsupported Google Books search field, dropping term");
          continue;
        },
      };
      let value = if term.value.chars().any(char::is_whitespace) {
        format!("\"{}\"", term.value)
      } else {
        term.value.clone()
      };
      tokens.push(format!("{prefix}:{value}"));
    }

    let mut params = QueryParams::new().with("q", tokens.join(" "));
    let options = &request.options;
    if let Some(limit) = options.param_u64("maxResults").or_else(|| options.param_u64("limit")) {
      params.push("maxResults", limit.to_string());
    }
    if let Some(offset) = options.param_u64("startIndex").or_else(|| options.param_u64("offset")) {
      params.push("startIndex", offset.to_string());
    }
    for name in ["printType", "projection", "langRestrict"] {
      if let Some(value) = options.param_text(name) {
        params.push(name, value);
      }
    }
    if let Some(key) = &self.client.settings().api_key {
      params.push("key", key.clone());
    }
    params
  }

  /// `GET /books/v1/volumes`
  #[instrument(skip(self, params), level = "debug")]
  pub async fn get_volumes(&self, params: &QueryParams) -> GoogleBooksMessage {
    let message = self.client.fetch("/books/v1/volumes", params, &VOLUMES, &self.dialect).await;
    GoogleBooksMessage { message }
  }
}

#[async_trait]
impl LookupAdapter for GoogleBooksService {
  fn settings(&self) -> &ServiceSettings { self.client.settings() }

  async fn lookup(&self, request: &LookupRequest) -> LookupReply {
    let mut message = self.get_volumes(&self.build_query(request)).await;
    message.inject_lccns(&request.identifiers_of(IdentifierKind::Lccn));
    LookupReply::from_message(&message)
  }
}
