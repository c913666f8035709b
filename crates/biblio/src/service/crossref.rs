//! Crossref REST API adapter.
//!
//! Searches go to `GET /works` with `query.<field>` parameters, identifier filters and an
//! optional `select`; a request holding exactly one DOI fetches `GET /works/{doi}`. Crossref keys
//! are dasherized and partly upper-case (`container-title`, `DOI`, `ISBN`), so the dialect
//! underscores every incoming key before generic deserialization.

use super::*;
use crate::lookup::{join_title, LookupAdapter, LookupItem, LookupReply, LookupRequest, Normalize, TermKind};

/// Values accepted by the `select` parameter, in Crossref's spelling.
pub const SELECT_ELEMENTS: [&str; 56] = [
  "abstract",
  "URL",
  "member",
  "posted",
  "score",
  "created",
  "degree",
  "update-policy",
  "short-title",
  "license",
  "ISSN",
  "container-title",
  "issued",
  "update-to",
  "issue",
  "prefix",
  "approved",
  "indexed",
  "article-number",
  "clinical-trial-number",
  "accepted",
  "author",
  "group-title",
  "DOI",
  "is-referenced-by-count",
  "updated-by",
  "event",
  "chair",
  "standards-body",
  "original-title",
  "funder",
  "translator",
  "archive",
  "published-print",
  "alternative-id",
  "subject",
  "subtitle",
  "published-online",
  "publisher-location",
  "content-domain",
  "reference",
  "title",
  "link",
  "type",
  "publisher",
  "volume",
  "references-count",
  "ISBN",
  "issn-type",
  "assertion",
  "deposited",
  "page",
  "content-created",
  "short-container-title",
  "relation",
  "editor",
];

/// Search field aliases and the `query.*` parameter each maps to.
pub const QUERY_PREFIX: [(&str, &str); 14] = [
  ("author", "query.author"),
  ("title", "query.bibliographic"),
  ("bibliographic", "query.bibliographic"),
  ("publisher", "query.publisher-name"),
  ("editor", "query.editor"),
  ("contributor", "query.contributor"),
  ("chair", "query.chair"),
  ("translator", "query.translator"),
  ("container", "query.container-title"),
  ("journal", "query.container-title"),
  ("affiliation", "query.affiliation"),
  ("degree", "query.degree"),
  ("keyword", "query"),
  ("query", "query"),
];

lazy_static! {
  /// `{date-parts, date-time, timestamp}`
  pub static ref DATE: SchemaRef = define_schema("crossref_date", vec![
    Field::many("date_parts", ScalarType::Integer),
    Field::scalar("date_time", ScalarType::DateTime),
    Field::scalar("timestamp", ScalarType::Integer),
  ])
  .expect("valid crossref date schema");

  static ref AFFILIATION: SchemaRef =
    define_schema("crossref_affiliation", vec![Field::text("name")]).expect("valid affiliation schema");

  /// An author, editor or other contributor.
  pub static ref CONTRIBUTOR: SchemaRef = define_schema("crossref_contributor", vec![
    Field::text("given"),
    Field::text("family"),
    Field::text("name"),
    Field::text("suffix"),
    Field::text("orcid"),
    Field::text("sequence"),
    Field::many_records("affiliation", &AFFILIATION),
  ])
  .expect("valid contributor schema");

  static ref TYPED_VALUE: SchemaRef =
    define_schema("crossref_typed_value", vec![Field::text("type"), Field::text("value")])
      .expect("valid typed value schema");

  static ref LINK: SchemaRef = define_schema("crossref_link", vec![
    Field::text("url"),
    Field::text("content_type"),
    Field::text("content_version"),
    Field::text("intended_application"),
  ])
  .expect("valid link schema");

  /// One work.
  pub static ref WORK: SchemaRef = define_schema("crossref_work", vec![
    Field::text("doi"),
    Field::text("url"),
    Field::text("type"),
    Field::many_text("title"),
    Field::many_text("subtitle"),
    Field::many_text("short_title"),
    Field::many_text("container_title"),
    Field::many_text("short_container_title"),
    Field::text("publisher"),
    Field::text("publisher_location"),
    Field::many_records("author", &CONTRIBUTOR),
    Field::many_records("editor", &CONTRIBUTOR),
    Field::many_records("translator", &CONTRIBUTOR),
    Field::one("issued", &DATE),
    Field::one("published_print", &DATE),
    Field::one("published_online", &DATE),
    Field::one("created", &DATE),
    Field::many_text("isbn"),
    Field::many_records("isbn_type", &TYPED_VALUE),
    Field::many_text("issn"),
    Field::many_records("issn_type", &TYPED_VALUE),
    Field::text("volume"),
    Field::text("issue"),
    Field::text("page"),
    Field::text("language"),
    Field::text("abstract"),
    Field::many_text("subject"),
    Field::scalar("is_referenced_by_count", ScalarType::Integer),
    Field::scalar("references_count", ScalarType::Integer),
    Field::scalar("score", ScalarType::Float),
    Field::text("member"),
    Field::text("prefix"),
    Field::many_records("link", &LINK),
  ])
  .expect("valid crossref work schema");

  static ref WORK_LIST: SchemaRef = define_schema("crossref_work_list", vec![
    Field::scalar("total_results", ScalarType::Integer),
    Field::scalar("items_per_page", ScalarType::Integer),
    Field::many_records("items", &WORK),
    Field::text("next_cursor"),
  ])
  .expect("valid crossref work list schema");

  static ref WORK_MESSAGE: MessageType = MessageType::new(
    &define_schema("crossref_work_message", vec![
      Field::text("status"),
      Field::text("message_type"),
      Field::text("message_version"),
      Field::one("message", &WORK),
    ])
    .expect("valid crossref work message schema"),
  );

  static ref WORK_LIST_MESSAGE: MessageType = MessageType::new(
    &define_schema("crossref_work_list_message", vec![
      Field::text("status"),
      Field::text("message_type"),
      Field::text("message_version"),
      Field::one("message", &WORK_LIST),
    ])
    .expect("valid crossref work list message schema"),
  );
}

/// Which Crossref envelope a message holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossrefMessageKind {
  /// `message-type: work`
  Work,
  /// `message-type: work-list`
  WorkList,
}

/// A Crossref response.
#[derive(Debug, Clone)]
pub struct CrossrefMessage {
  message: Message,
  kind:    CrossrefMessageKind,
}

impl CrossrefMessage {
  /// Which envelope this is.
  pub fn kind(&self) -> CrossrefMessageKind { self.kind }

  /// `total-results` of a work list.
  pub fn total_results(&self) -> Option<i64> {
    self.message.record.record("message")?.integer("total_results")
  }
}

impl ApiMessage for CrossrefMessage {
  fn message(&self) -> &Message { &self.message }

  fn api_records(&self) -> Vec<Record> {
    let path: &[&str] = match self.kind {
      CrossrefMessageKind::Work => &["message"],
      CrossrefMessageKind::WorkList => &["message", "items"],
    };
    self.message.record.dig(path).into_iter().cloned().collect()
  }
}

impl Normalize for CrossrefMessage {
  fn normalize(&self, work: &Record) -> Option<LookupItem> {
    let mut item = LookupItem::new(&self.message.service);
    item.title = join_title(work.text("title"), work.text("subtitle"));
    item.creators = work.records("author").into_iter().filter_map(contributor_name).collect();
    item.publisher = work.text("publisher");
    item.date = ["issued", "published_print", "published_online"]
      .iter()
      .find_map(|name| work.record(name).and_then(date_text));
    item.description = work.text("abstract");
    item.language = work.text("language");
    item.link = work.text("url");
    if let Some(doi) = work.text("doi") {
      item.add_identifier_value(IdentifierKind::Doi, &doi);
    }
    for isbn in work.texts("isbn") {
      item.add_identifier_value(IdentifierKind::Isbn, &isbn);
    }
    for issn in work.texts("issn") {
      item.add_identifier_value(IdentifierKind::Issn, &issn);
    }
    (item.title.is_some() || !item.identifiers.is_empty()).then_some(item)
  }
}

fn contributor_name(contributor: &Record) -> Option<String> {
  match (contributor.text("family"), contributor.text("given")) {
    (Some(family), Some(given)) => Some(format!("{family}, {given}")),
    (Some(family), None) => Some(family),
    _ => contributor.text("name"),
  }
}

/// `[2019, 5, 1]` → `2019-05-01`
fn date_text(date: &Record) -> Option<String> {
  let parts: Vec<i64> = match date.get("date_parts")? {
    Value::List(parts) => parts
      .iter()
      .filter_map(|part| match part {
        Value::Integer(n) => Some(*n),
        _ => None,
      })
      .collect(),
    _ => return None,
  };
  match parts.as_slice() {
    [] => None,
    [year] => Some(format!("{year:04}")),
    [year, month] => Some(format!("{year:04}-{month:02}")),
    [year, month, day, ..] => Some(format!("{year:04}-{month:02}-{day:02}")),
  }
}

/// Resolves a `select` option into the parameter value.
///
/// `true` selects every element. Strings (comma separated) and arrays are matched against
/// [`SELECT_ELEMENTS`] ignoring case, `_`/`-` and a leading `:`; unknown entries are dropped with
/// a warning.
pub fn select_param(select: &JsonValue) -> Option<String> {
  let requested: Vec<String> = match select {
    JsonValue::Bool(true) => return Some(SELECT_ELEMENTS.join(",")),
    JsonValue::String(s) => s.split(',').map(str::to_string).collect(),
    JsonValue::Array(items) =>
      items.iter().filter_map(|item| item.as_str().map(str::to_string)).collect(),
    _ => Vec::new(),
  };
  let mut selected: Vec<&str> = Vec::new();
  for entry in requested {
    let wanted = entry.trim().trim_start_matches(':').replace('_', "-").to_ascii_lowercase();
    match SELECT_ELEMENTS.iter().find(|element| element.to_ascii_lowercase() == wanted) {
      Some(element) if !selected.contains(element) => selected.push(element),
      Some(_) => {},
      None => warn!(field = %entry, "Ignoring invalid Crossref select field"),
    }
  }
  (!selected.is_empty()).then(|| selected.join(","))
}

/// Path of a single work. Each DOI segment is percent-encoded so `?`, `#` and `%` stay part of
/// the path.
pub fn work_path(doi: &str) -> String {
  let segments: Vec<_> = doi.split('/').map(urlencoding::encode).collect();
  format!("/works/{}", segments.join("/"))
}

/// Crossref adapter.
#[derive(Debug, Clone)]
pub struct CrossrefService {
  client:  HttpClient,
  dialect: Dialect,
}

impl CrossrefService {
  /// Builds the adapter.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Network`] if the HTTP client cannot be created.
  pub fn new(settings: ServiceSettings) -> Result<Self> {
    let dialect = Dialect::for_format(Format::Json).with_key_transform(NameTransform::Underscore);
    Ok(Self { client: HttpClient::new(settings)?, dialect })
  }

  /// Translates a request into `/works` query parameters.
  ///
  /// # Examples
  ///
  /// ```
  /// use biblio::{
  ///   configuration::ServiceSettings,
  ///   lookup::LookupRequest,
  ///   service::crossref::CrossrefService,
  /// };
  /// use serde_json::json;
  ///
  /// let crossref = CrossrefService::new(ServiceSettings::new("crossref", "https://api.crossref.org"))?;
  /// let mut request = LookupRequest::from_terms(["author:Melville", "isbn:0142437247"])?;
  /// request.options.params.insert("select".into(), json!(["doi", "title"]));
  ///
  /// let params = crossref.build_query(&request);
  /// assert_eq!(params.get("query.author"), Some("Melville"));
  /// assert_eq!(params.get("filter"), Some("isbn:9780142437247"));
  /// assert_eq!(params.get("select"), Some("DOI,title"));
  /// # Ok::<(), biblio::error::BiblioError>(())
  /// ```
  pub fn build_query(&self, request: &LookupRequest) -> QueryParams {
    let mut queries: Vec<(&'static str, Vec<&str>)> = Vec::new();
    let mut filters = Vec::new();
    for term in request.terms() {
      let alias = match &term.kind {
        TermKind::Identifier(kind @ (IdentifierKind::Doi | IdentifierKind::Isbn | IdentifierKind::Issn)) => {
          filters.push(format!("{kind}:{}", term.value));
          continue;
        },
        TermKind::Identifier(kind) => {
          warn!(service = CROSSREF, kind = %kind, "Crossref cannot search by this identifier, dropping term");
          continue;
        },
        TermKind::Keyword => "keyword",
        TermKind::Author => "author",
        TermKind::Title => "title",
        TermKind::Publisher => "publisher",
        TermKind::Subject => "subject",
        TermKind::Other(name) => name.as_str(),
      };
      match QUERY_PREFIX.iter().find(|(prefix, _)| *prefix == alias) {
        Some(&(_, param)) => match queries.iter_mut().find(|(existing, _)| *existing == param) {
          Some((_, values)) => values.push(&term.value),
          None => queries.push((param, vec![&term.value])),
        },
        None => warn!(service = CROSSREF, field = %alias, "Unsupported Crossref search field, dropping term"),
      }
    }

    let mut params = QueryParams::new();
    for (param, values) in queries {
      params.push(param, values.join(" "));
    }
    if !filters.is_empty() {
      params.push("filter", filters.join(","));
    }
    if let Some(select) = request.param("select").and_then(select_param) {
      params.push("select", select);
    }
    let options = &request.options;
    if let Some(rows) = options.param_u64("rows").or_else(|| options.param_u64("limit")) {
      params.push("rows", rows.to_string());
    }
    if let Some(offset) = options.param_u64("offset") {
      params.push("offset", offset.to_string());
    }
    for name in ["sort", "order"] {
      if let Some(value) = options.param_text(name) {
        params.push(name, value);
      }
    }
    if let Some(mailto) = &self.client.settings().mailto {
      params.push("mailto", mailto.clone());
    }
    params
  }

  /// `GET /works/{doi}`
  #[instrument(skip(self), level = "debug")]
  pub async fn get_work(&self, doi: &str) -> CrossrefMessage {
    let mut params = QueryParams::new();
    if let Some(mailto) = &self.client.settings().mailto {
      params.push("mailto", mailto.clone());
    }
    let message = self.client.fetch(&work_path(doi), &params, &WORK_MESSAGE, &self.dialect).await;
    CrossrefMessage { message, kind: CrossrefMessageKind::Work }
  }

  /// `GET /works`
  #[instrument(skip(self, params), level = "debug")]
  pub async fn get_works(&self, params: &QueryParams) -> CrossrefMessage {
    let message = self.client.fetch("/works", params, &WORK_LIST_MESSAGE, &self.dialect).await;
    CrossrefMessage { message, kind: CrossrefMessageKind::WorkList }
  }
}

#[async_trait]
impl LookupAdapter for CrossrefService {
  fn settings(&self) -> &ServiceSettings { self.client.settings() }

  async fn lookup(&self, request: &LookupRequest) -> LookupReply {
    let dois = request.identifiers_of(IdentifierKind::Doi);
    let message = match dois.as_slice() {
      [doi] if request.terms().len() == 1 => self.get_work(doi).await,
      _ => self.get_works(&self.build_query(request)).await,
    };
    LookupReply::from_message(&message)
  }
}
