//! WorldCat Search API adapter.
//!
//! Plain keyword searches use the OpenSearch endpoint, which answers with an Atom feed. Searches
//! on fields or identifiers use SRU with a CQL query over the `srw.*` indexes; SRU records come
//! back as Dublin Core unless MARCXML is requested with the `schema` option.
//!
//! The API key travels as `wskey`.

use super::*;
use crate::lookup::{LookupAdapter, LookupItem, LookupReply, LookupRequest, Normalize, TermKind};

/// OpenSearch endpoint.
pub const OPENSEARCH_PATH: &str = "/webservices/catalog/search/opensearch";
/// SRU endpoint.
pub const SRU_PATH: &str = "/webservices/catalog/search/sru";
/// Dublin Core record schema.
pub const DUBLIN_CORE: &str = "info:srw/schema/1/dc";
/// MARCXML record schema.
pub const MARCXML: &str = "info:srw/schema/1/marcxml";

lazy_static! {
  static ref BARE_ISBN: Regex = Regex::new(r"^[\d-]+[Xx]?$").expect("valid bare ISBN pattern");

  static ref PERSON: SchemaRef =
    define_schema("atom_person", vec![Field::text("name"), Field::text("uri")]).expect("valid person schema");

  static ref ATOM_LINK: SchemaRef = define_schema("atom_link", vec![
    Field::text("href").attribute(),
    Field::text("rel").attribute(),
  ])
  .expect("valid link schema");

  /// One OpenSearch feed entry.
  pub static ref ENTRY: SchemaRef = define_schema("worldcat_entry", vec![
    Field::many_records("author", &PERSON),
    Field::text("title"),
    Field::one("link", &ATOM_LINK),
    Field::text("id"),
    Field::text("summary"),
    Field::text("updated"),
    Field::text("content"),
    Field::many_text("dc_identifier").wire("dc:identifier"),
    Field::text("record_identifier").wire("oclcterms:recordIdentifier"),
  ])
  .expect("valid entry schema");

  static ref FEED: MessageType = MessageType::new(
    &define_schema("worldcat_feed", vec![
      Field::text("title"),
      Field::text("id"),
      Field::text("updated"),
      Field::scalar("total_results", ScalarType::Integer).wire("opensearch:totalResults"),
      Field::scalar("start_index", ScalarType::Integer).wire("opensearch:startIndex"),
      Field::scalar("items_per_page", ScalarType::Integer).wire("opensearch:itemsPerPage"),
      Field::many_records("entry", &ENTRY),
    ])
    .expect("valid feed schema"),
  );

  /// An `oclcdcs` Dublin Core record.
  pub static ref DC_RECORD: SchemaRef = define_schema("worldcat_dc_record", vec![
    Field::many_text("dc_creator").wire("dc:creator"),
    Field::many_text("dc_contributor").wire("dc:contributor"),
    Field::many_text("dc_title").wire("dc:title"),
    Field::many_text("dc_publisher").wire("dc:publisher"),
    Field::many_text("dc_date").wire("dc:date"),
    Field::many_text("dc_description").wire("dc:description"),
    Field::many_text("dc_language").wire("dc:language"),
    Field::many_text("dc_subject").wire("dc:subject"),
    Field::many_text("dc_type").wire("dc:type"),
    Field::many_text("dc_format").wire("dc:format"),
    Field::many_text("dc_identifier").wire("dc:identifier"),
    Field::text("record_identifier").wire("oclcterms:recordIdentifier"),
  ])
  .expect("valid Dublin Core schema");

  static ref SUBFIELD: SchemaRef = define_schema("marc_subfield", vec![
    Field::text("code").attribute(),
    Field::text("value").content(),
  ])
  .expect("valid subfield schema");

  static ref CONTROL_FIELD: SchemaRef = define_schema("marc_controlfield", vec![
    Field::text("tag").attribute(),
    Field::text("value").content(),
  ])
  .expect("valid controlfield schema");

  static ref DATA_FIELD: SchemaRef = define_schema("marc_datafield", vec![
    Field::text("tag").attribute(),
    Field::text("ind1").attribute(),
    Field::text("ind2").attribute(),
    Field::many_records("subfield", &SUBFIELD),
  ])
  .expect("valid datafield schema");

  /// A MARCXML record.
  pub static ref MARC_RECORD: SchemaRef = define_schema("marc_record", vec![
    Field::text("leader"),
    Field::many_records("controlfield", &CONTROL_FIELD),
    Field::many_records("datafield", &DATA_FIELD),
  ])
  .expect("valid MARC record schema");

  static ref RECORD_DATA: SchemaRef = define_schema("sru_record_data", vec![
    Field::one("oclcdcs", &DC_RECORD),
    Field::one("record", &MARC_RECORD),
  ])
  .expect("valid record data schema");

  static ref SRU_RECORD: SchemaRef = define_schema("sru_record", vec![
    Field::text("record_schema").wire("recordSchema"),
    Field::text("record_packing").wire("recordPacking"),
    Field::one("record_data", &RECORD_DATA).wire("recordData"),
    Field::scalar("record_position", ScalarType::Integer).wire("recordPosition"),
  ])
  .expect("valid SRU record schema");

  static ref SRU_DIAGNOSTIC: SchemaRef = define_schema("sru_diagnostic", vec![
    Field::text("uri"),
    Field::text("details"),
    Field::text("message"),
  ])
  .expect("valid SRU diagnostic schema");

  static ref SEARCH_RETRIEVE: MessageType = MessageType::new(
    &define_schema("sru_search_retrieve_response", vec![
      Field::text("version"),
      Field::scalar("number_of_records", ScalarType::Integer).wire("numberOfRecords"),
      Field::many_records("record", &SRU_RECORD).wrapped(true),
      Field::many_records("diagnostic", &SRU_DIAGNOSTIC).wrapped(true),
    ])
    .expect("valid SRU response schema"),
  );
}

/// Prefixes a bare ISBN-looking identifier with `isbn:`. Values that already carry a type
/// (`urn:ISBN:...`, `oclc:...`) or are URLs are returned unchanged.
///
/// This is a heuristic: a bare digit string is assumed to be an ISBN.
///
/// ```
/// use biblio::service::worldcat::prefix_bare_identifier;
///
/// assert_eq!(prefix_bare_identifier("0123456789"), "isbn:0123456789");
/// assert_eq!(prefix_bare_identifier("urn:ISBN:0123456789"), "urn:ISBN:0123456789");
/// assert_eq!(prefix_bare_identifier("http://worldcat.org/oclc/1"), "http://worldcat.org/oclc/1");
/// ```
pub fn prefix_bare_identifier(value: &str) -> String {
  let trimmed = value.trim();
  if trimmed.contains(':') || trimmed.starts_with("http") || !BARE_ISBN.is_match(trimmed) {
    value.to_string()
  } else {
    format!("isbn:{trimmed}")
  }
}

/// Which WorldCat response shape a message holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldcatMessageKind {
  /// OpenSearch Atom feed.
  OpenSearch,
  /// SRU searchRetrieveResponse.
  Sru,
}

/// A WorldCat response.
#[derive(Debug, Clone)]
pub struct WorldcatMessage {
  message: Message,
  kind:    WorldcatMessageKind,
}

impl WorldcatMessage {
  fn new(message: Message, kind: WorldcatMessageKind) -> Self {
    let mut message = Self { message, kind };
    if kind == WorldcatMessageKind::Sru {
      message.prefix_identifiers();
    }
    message
  }

  /// Which response shape this is.
  pub fn kind(&self) -> WorldcatMessageKind { self.kind }

  /// Result count reported by the service.
  pub fn total_results(&self) -> Option<i64> {
    match self.kind {
      WorldcatMessageKind::OpenSearch => self.message.record.integer("total_results"),
      WorldcatMessageKind::Sru => self.message.record.integer("number_of_records"),
    }
  }

  /// SRU diagnostics (`message: details`).
  pub fn diagnostics(&self) -> Vec<String> {
    self
      .message
      .record
      .records("diagnostic")
      .into_iter()
      .filter_map(|diagnostic| match (diagnostic.text("message"), diagnostic.text("details")) {
        (Some(message), Some(details)) => Some(format!("{message}: {details}")),
        (message, details) => message.or(details),
      })
      .collect()
  }

  fn prefix_identifiers(&mut self) {
    let Some(Value::List(records)) = self.message.record.get_mut("record") else { return };
    for sru in records.iter_mut().filter_map(Value::as_record_mut) {
      let Some(data) = sru.get_mut("record_data").and_then(Value::as_record_mut) else { continue };
      let Some(dc) = data.get_mut("oclcdcs").and_then(Value::as_record_mut) else { continue };
      if let Some(Value::List(identifiers)) = dc.get_mut("dc_identifier") {
        for identifier in identifiers.iter_mut() {
          if let Value::Text(text) = identifier {
            *text = prefix_bare_identifier(text);
          }
        }
      }
    }
  }
}

impl ApiMessage for WorldcatMessage {
  fn message(&self) -> &Message { &self.message }

  fn api_records(&self) -> Vec<Record> {
    match self.kind {
      WorldcatMessageKind::OpenSearch =>
        self.message.record.records("entry").into_iter().cloned().collect(),
      WorldcatMessageKind::Sru => self
        .message
        .record
        .records("record")
        .into_iter()
        .filter_map(|sru| sru.record("record_data"))
        .filter_map(|data| data.record("oclcdcs").or_else(|| data.record("record")))
        .cloned()
        .collect(),
    }
  }
}

impl Normalize for WorldcatMessage {
  fn normalize(&self, record: &Record) -> Option<LookupItem> {
    let service = &self.message.service;
    let item = match record.schema().name() {
      "worldcat_entry" => normalize_entry(service, record),
      "worldcat_dc_record" => normalize_dc(service, record),
      "marc_record" => normalize_marc(service, record),
      _ => return None,
    };
    (item.title.is_some() || !item.identifiers.is_empty()).then_some(item)
  }
}

/// Adds identifiers written `urn:ISBN:...`, `isbn:...`, `oclc:...` or bare.
fn add_identifier_text(item: &mut LookupItem, value: &str) {
  match Identifier::detect(value) {
    Some(identifier) => item.add_identifier(identifier),
    None => trace!(value, "Unrecognized WorldCat identifier"),
  }
}

fn normalize_entry(service: &str, entry: &Record) -> LookupItem {
  let mut item = LookupItem::new(service);
  item.title = entry.text("title");
  item.creators = entry.records("author").into_iter().filter_map(|a| a.text("name")).collect();
  item.description = entry.text("summary").or_else(|| entry.text("content"));
  item.link = entry.record("link").and_then(|link| link.text("href")).or_else(|| entry.text("id"));
  if let Some(oclc) = entry.text("record_identifier") {
    item.add_identifier_value(IdentifierKind::Oclc, &oclc);
  }
  for identifier in entry.texts("dc_identifier") {
    add_identifier_text(&mut item, &identifier);
  }
  item
}

fn normalize_dc(service: &str, dc: &Record) -> LookupItem {
  let mut item = LookupItem::new(service);
  item.title = dc.text("dc_title");
  item.creators = dc.texts("dc_creator");
  item.publisher = dc.text("dc_publisher");
  item.date = dc.text("dc_date");
  item.description = dc.text("dc_description");
  item.language = dc.text("dc_language");
  if let Some(oclc) = dc.text("record_identifier") {
    item.add_identifier_value(IdentifierKind::Oclc, &oclc);
  }
  for identifier in dc.texts("dc_identifier") {
    add_identifier_text(&mut item, &identifier);
  }
  item
}

/// Subfield values of every datafield tagged `tag` whose code is in `codes`, joined per field.
fn marc_values(record: &Record, tag: &str, codes: &str) -> Vec<String> {
  record
    .records("datafield")
    .into_iter()
    .filter(|field| field.text("tag").as_deref() == Some(tag))
    .filter_map(|field| {
      let parts: Vec<String> = field
        .records("subfield")
        .into_iter()
        .filter(|sub| sub.text("code").is_some_and(|code| codes.contains(code.as_str())))
        .filter_map(|sub| sub.text("value"))
        .map(|value| value.trim().to_string())
        .collect();
      (!parts.is_empty()).then(|| parts.join(" "))
    })
    .collect()
}

/// Strips ISBD punctuation left at the end of MARC subfields (` /`, ` :`, `,`, `.`).
fn trim_marc(value: &str) -> String {
  value.trim().trim_end_matches([' ', '/', ':', ';', ',', '.']).to_string()
}

fn normalize_marc(service: &str, marc: &Record) -> LookupItem {
  let mut item = LookupItem::new(service);
  item.title = marc_values(marc, "245", "ab").first().map(|title| trim_marc(title));
  item.creators = marc_values(marc, "100", "a").iter().map(|name| trim_marc(name)).collect();
  let imprint = |code: &str| {
    marc_values(marc, "264", code).into_iter().chain(marc_values(marc, "260", code)).next()
  };
  item.publisher = imprint("b").map(|publisher| trim_marc(&publisher));
  item.date = imprint("c").map(|date| trim_marc(&date));
  item.description = marc_values(marc, "520", "a").into_iter().next();

  if let Some(oclc) = marc
    .records("controlfield")
    .into_iter()
    .find(|field| field.text("tag").as_deref() == Some("001"))
    .and_then(|field| field.text("value"))
  {
    item.add_identifier_value(IdentifierKind::Oclc, oclc.trim());
  }
  for (tag, kind) in
    [("010", IdentifierKind::Lccn), ("020", IdentifierKind::Isbn), ("022", IdentifierKind::Issn)]
  {
    for value in marc_values(marc, tag, "a") {
      // "0142437247 (pbk.)"
      let value = value.split_whitespace().next().unwrap_or_default();
      item.add_identifier_value(kind, value);
    }
  }
  item
}

/// WorldCat adapter.
#[derive(Debug, Clone)]
pub struct WorldcatService {
  client:  HttpClient,
  dialect: Dialect,
}

impl WorldcatService {
  /// Builds the adapter.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Network`] if the HTTP client cannot be created.
  pub fn new(settings: ServiceSettings) -> Result<Self> {
    let dialect = Dialect::for_format(Format::Xml)
      .with_elements(NameTransform::Identity)
      .with_attributes(NameTransform::Identity)
      .with_wrapping(false);
    Ok(Self { client: HttpClient::new(settings)?.with_param_rename("api_key", "wskey"), dialect })
  }

  /// Whether `request` needs SRU (anything beyond plain keywords).
  pub fn needs_sru(request: &LookupRequest) -> bool {
    request.terms().iter().any(|term| term.kind != TermKind::Keyword)
  }

  /// Builds a CQL query over the `srw.*` indexes.
  ///
  /// ```
  /// use biblio::{lookup::LookupRequest, service::worldcat::WorldcatService};
  ///
  /// let request = LookupRequest::from_terms(["title:Moby Dick", "oclc:ocm00012345"])?;
  /// assert_eq!(WorldcatService::cql(&request), r#"srw.ti all "Moby Dick" and srw.no = "12345""#);
  /// # Ok::<(), biblio::error::BiblioError>(())
  /// ```
  pub fn cql(request: &LookupRequest) -> String {
    let clauses: Vec<String> = request
      .terms()
      .iter()
      .filter_map(|term| {
        let (index, relation) = match &term.kind {
          TermKind::Keyword => ("srw.kw", "all"),
          TermKind::Title => ("srw.ti", "all"),
          TermKind::Author => ("srw.au", "all"),
          TermKind::Publisher => ("srw.pb", "all"),
          TermKind::Subject => ("srw.su", "all"),
          TermKind::Identifier(IdentifierKind::Isbn) => ("srw.bn", "="),
          TermKind::Identifier(IdentifierKind::Issn) => ("srw.in", "="),
          TermKind::Identifier(IdentifierKind::Oclc) => ("srw.no", "="),
          TermKind::Identifier(IdentifierKind::Lccn) => ("srw.dn", "="),
          other => {
            warn!(service = WORLDCAT, field = %other, "Unsupported WorldCat search field, dropping term");
            return None;
          },
        };
        let value = term.value.replace('"', "\\\"");
        Some(format!("{index} {relation} \"{value}\""))
      })
      .collect();
    clauses.join(" and ")
  }

  /// Translates a request into OpenSearch or SRU parameters, returning the path to query.
  pub fn build_query(&self, request: &LookupRequest) -> (&'static str, QueryParams) {
    let options = &request.options;
    let limit = options.param_u64("limit").or_else(|| options.param_u64("count"));
    let start = options.param_u64("offset").map(|offset| offset + 1);
    let mut params = QueryParams::new();
    let path = if Self::needs_sru(request) {
      params.push("query", Self::cql(request));
      let schema = match options.param_text("schema").as_deref() {
        Some("marcxml" | MARCXML) => MARCXML,
        _ => DUBLIN_CORE,
      };
      params.push("recordSchema", schema);
      if let Some(limit) = limit {
        params.push("maximumRecords", limit.to_string());
      }
      if let Some(start) = start {
        params.push("startRecord", start.to_string());
      }
      SRU_PATH
    } else {
      let keywords: Vec<&str> = request.terms().iter().map(|term| term.value.as_str()).collect();
      params.push("q", keywords.join(" "));
      params.push("format", "atom");
      if let Some(limit) = limit {
        params.push("count", limit.to_string());
      }
      if let Some(start) = start {
        params.push("start", start.to_string());
      }
      OPENSEARCH_PATH
    };
    if let Some(key) = &self.client.settings().api_key {
      params.push("api_key", key.clone());
    }
    (path, params)
  }

  /// `GET .../opensearch`
  #[instrument(skip(self, params), level = "debug")]
  pub async fn get_opensearch(&self, params: &QueryParams) -> WorldcatMessage {
    let message = self.client.fetch(OPENSEARCH_PATH, params, &FEED, &self.dialect).await;
    WorldcatMessage::new(message, WorldcatMessageKind::OpenSearch)
  }

  /// `GET .../sru`
  #[instrument(skip(self, params), level = "debug")]
  pub async fn get_sru(&self, params: &QueryParams) -> WorldcatMessage {
    let message = self.client.fetch(SRU_PATH, params, &SEARCH_RETRIEVE, &self.dialect).await;
    let message = WorldcatMessage::new(message, WorldcatMessageKind::Sru);
    for diagnostic in message.diagnostics() {
      warn!(service = WORLDCAT, diagnostic = %diagnostic, "SRU diagnostic");
    }
    message
  }
}

#[async_trait]
impl LookupAdapter for WorldcatService {
  fn settings(&self) -> &ServiceSettings { self.client.settings() }

  async fn lookup(&self, request: &LookupRequest) -> LookupReply {
    let message = match self.build_query(request) {
      (SRU_PATH, params) => self.get_sru(&params).await,
      (_, params) => self.get_opensearch(&params).await,
    };
    LookupReply::from_message(&message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn worldcat() -> WorldcatService {
    let mut settings = ServiceSettings::new(WORLDCAT, "http://localhost");
    settings.api_key = Some("secret".to_string());
    WorldcatService::new(settings).unwrap()
  }

  fn sru(body: &str) -> WorldcatMessage {
    let message = SEARCH_RETRIEVE.parse(WORLDCAT, Some(200), Wire::from(body), &worldcat().dialect);
    WorldcatMessage::new(message, WorldcatMessageKind::Sru)
  }

  #[test]
  fn test_bare_identifier_prefixing() {
    assert_eq!(prefix_bare_identifier("0123456789"), "isbn:0123456789");
    assert_eq!(prefix_bare_identifier("080442957X"), "isbn:080442957X");
    assert_eq!(prefix_bare_identifier("oclc:12345"), "oclc:12345");
    assert_eq!(prefix_bare_identifier("https://example.org/1"), "https://example.org/1");
    assert_eq!(prefix_bare_identifier("Moby Dick"), "Moby Dick");
  }

  #[test]
  fn test_keyword_search_uses_opensearch() {
    let request = LookupRequest::from_terms(["whale", "ship"]).unwrap();
    let (path, params) = worldcat().build_query(&request);
    assert_eq!(path, OPENSEARCH_PATH);
    assert_eq!(params.get("q"), Some("whale ship"));
    assert_eq!(params.get("api_key"), Some("secret"));
  }

  #[test]
  fn test_field_search_uses_sru() {
    let mut request = LookupRequest::from_terms(["author:Melville", "isbn:0142437247"]).unwrap();
    request.options.params.insert("schema".into(), json!("marcxml"));
    request.options.params.insert("limit".into(), json!(5));
    let (path, params) = worldcat().build_query(&request);
    assert_eq!(path, SRU_PATH);
    assert_eq!(params.get("query"), Some(r#"srw.au all "Melville" and srw.bn = "9780142437247""#));
    assert_eq!(params.get("recordSchema"), Some(MARCXML));
    assert_eq!(params.get("maximumRecords"), Some("5"));
  }

  #[test]
  fn test_sru_dublin_core() {
    let message = sru(
      r#"<?xml version="1.0" encoding="UTF-8"?>
      <searchRetrieveResponse xmlns="http://www.loc.gov/zing/srw/">
        <version>1.1</version>
        <numberOfRecords>1</numberOfRecords>
        <records>
          <record>
            <recordSchema>info:srw/schema/1/dc</recordSchema>
            <recordPacking>xml</recordPacking>
            <recordData>
              <oclcdcs>
                <dc:creator>Melville, Herman</dc:creator>
                <dc:title>Moby Dick</dc:title>
                <dc:identifier>0142437247</dc:identifier>
                <dc:identifier>http://example.org/moby</dc:identifier>
                <oclcterms:recordIdentifier>12345</oclcterms:recordIdentifier>
              </oclcdcs>
            </recordData>
            <recordPosition>1</recordPosition>
          </record>
        </records>
      </searchRetrieveResponse>"#,
    );
    assert_eq!(message.total_results(), Some(1));
    let records = message.api_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].texts("dc_identifier"), vec!["isbn:0142437247", "http://example.org/moby"]);

    let items = message.items();
    assert_eq!(items[0].title.as_deref(), Some("Moby Dick"));
    assert_eq!(
      items[0].identifiers.iter().map(ToString::to_string).collect::<Vec<_>>(),
      vec!["oclc:12345", "isbn:9780142437247"]
    );
  }

  #[test]
  fn test_sru_marcxml() {
    let message = sru(
      r#"<searchRetrieveResponse>
        <numberOfRecords>1</numberOfRecords>
        <records><record><recordData>
          <record xmlns="http://www.loc.gov/MARC21/slim">
            <leader>00000cam a2200000 a 4500</leader>
            <controlfield tag="001">ocm00012345</controlfield>
            <datafield tag="010" ind1=" " ind2=" "><subfield code="a">   51001234 </subfield></datafield>
            <datafield tag="020" ind1=" " ind2=" "><subfield code="a">0142437247 (pbk.)</subfield></datafield>
            <datafield tag="100" ind1="1" ind2=" "><subfield code="a">Melville, Herman,</subfield></datafield>
            <datafield tag="245" ind1="1" ind2="0">
              <subfield code="a">Moby-Dick, or, The whale /</subfield>
              <subfield code="c">Herman Melville.</subfield>
            </datafield>
            <datafield tag="264" ind1=" " ind2="1">
              <subfield code="a">New York :</subfield>
              <subfield code="b">Penguin Books,</subfield>
              <subfield code="c">2003.</subfield>
            </datafield>
          </record>
        </recordData></record></records>
      </searchRetrieveResponse>"#,
    );
    let items = message.items();
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.title.as_deref(), Some("Moby-Dick, or, The whale"));
    assert_eq!(item.creators, vec!["Melville, Herman"]);
    assert_eq!(item.publisher.as_deref(), Some("Penguin Books"));
    assert_eq!(item.date.as_deref(), Some("2003"));
    assert_eq!(
      item.identifiers.iter().map(ToString::to_string).collect::<Vec<_>>(),
      vec!["oclc:12345", "lccn:51001234", "isbn:9780142437247"]
    );
  }

  #[test]
  fn test_opensearch_feed() {
    let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
      <feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
        <title>OCLC Worldcat Search: whale</title>
        <opensearch:totalResults>2</opensearch:totalResults>
        <entry>
          <author><name>Melville, Herman</name></author>
          <title>Moby Dick</title>
          <link href="http://worldcat.org/oclc/12345"/>
          <id>http://worldcat.org/oclc/12345</id>
          <dc:identifier>urn:ISBN:0142437247</dc:identifier>
          <oclcterms:recordIdentifier>12345</oclcterms:recordIdentifier>
        </entry>
        <entry><title>Whale Song</title></entry>
      </feed>"#;
    let message = FEED.parse(WORLDCAT, Some(200), Wire::from(feed), &worldcat().dialect);
    let message = WorldcatMessage::new(message, WorldcatMessageKind::OpenSearch);
    assert_eq!(message.total_results(), Some(2));
    let items = message.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].link.as_deref(), Some("http://worldcat.org/oclc/12345"));
    assert_eq!(items[0].creators, vec!["Melville, Herman"]);
    assert!(items[0].has_identifier(&Identifier::parse("isbn:9780142437247").unwrap()));
  }

  #[traced_test]
  #[test]
  fn test_sru_diagnostics() {
    let message = sru(
      r#"<searchRetrieveResponse><numberOfRecords>0</numberOfRecords>
        <diagnostics><diagnostic><uri>info:srw/diagnostic/1/10</uri>
        <message>Query syntax error</message><details>srw.xx</details></diagnostic></diagnostics>
      </searchRetrieveResponse>"#,
    );
    assert_eq!(message.diagnostics(), vec!["Query syntax error: srw.xx"]);
    assert!(message.items().is_empty());
  }
}
