use biblio::{
  identifier::Identifier,
  service::worldcat::{WorldcatService, DUBLIN_CORE, OPENSEARCH_PATH, SRU_PATH},
};

use super::*;

const SRU_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
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
          <dc:publisher>Penguin Books</dc:publisher>
          <dc:identifier>0142437247</dc:identifier>
          <oclcterms:recordIdentifier>52565224</oclcterms:recordIdentifier>
        </oclcdcs>
      </recordData>
      <recordPosition>1</recordPosition>
    </record>
  </records>
</searchRetrieveResponse>"#;

fn worldcat(server: &MockServer) -> WorldcatService {
  let mut settings = mock_settings("worldcat", server);
  settings.api_key = Some("secret".to_string());
  WorldcatService::new(settings).unwrap()
}

#[tokio::test]
async fn test_sru_search_prefixes_bare_isbns() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(SRU_PATH))
    .and(query_param("query", r#"srw.au all "Melville""#))
    .and(query_param("recordSchema", DUBLIN_CORE))
    .and(query_param("wskey", "secret"))
    .respond_with(ResponseTemplate::new(200).set_body_string(SRU_BODY))
    .expect(1)
    .mount(&server)
    .await;

  let reply = worldcat(&server).lookup(&LookupRequest::from_terms(["author:Melville"])?).await;

  assert!(reply.message.is_ok());
  assert_eq!(reply.items.len(), 1);
  let item = &reply.items[0];
  assert_eq!(item.title.as_deref(), Some("Moby Dick"));
  assert!(item.has_identifier(&Identifier::parse("isbn:9780142437247")?));
  assert!(item.has_identifier(&Identifier::parse("oclc:52565224")?));

  let requests = server.received_requests().await.unwrap();
  assert!(requests[0].url.query_pairs().all(|(key, _)| key != "api_key"));
  Ok(())
}

#[tokio::test]
async fn test_keywords_use_opensearch() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(OPENSEARCH_PATH))
    .and(query_param("q", "white whale"))
    .and(query_param("format", "atom"))
    .respond_with(ResponseTemplate::new(200).set_body_string(
      r#"<feed xmlns="http://www.w3.org/2005/Atom">
        <entry><title>The White Whale</title><id>http://worldcat.org/oclc/1</id></entry>
      </feed>"#,
    ))
    .expect(1)
    .mount(&server)
    .await;

  let reply = worldcat(&server).lookup(&LookupRequest::from_terms(["white", "whale"])?).await;
  assert_eq!(reply.items.len(), 1);
  assert_eq!(reply.items[0].title.as_deref(), Some("The White Whale"));
  Ok(())
}

#[tokio::test]
async fn test_plain_text_error_body_becomes_exception() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(SRU_PATH))
    .respond_with(ResponseTemplate::new(200).set_body_string("wskey is invalid"))
    .mount(&server)
    .await;

  let reply = worldcat(&server).lookup(&LookupRequest::from_terms(["isbn:0142437247"])?).await;
  assert!(matches!(reply.message.exception, Some(TransportError::Malformed(_))));
  assert!(reply.items.is_empty());
  Ok(())
}
