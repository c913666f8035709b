use biblio::service::crossref::{CrossrefService, SELECT_ELEMENTS};

use super::*;

fn work_list() -> serde_json::Value {
  json!({
    "status": "ok",
    "message-type": "work-list",
    "message": {
      "total-results": 1,
      "items": [{
        "DOI": "10.1000/xyz123",
        "title": ["Moby-Dick"],
        "author": [{"given": "Herman", "family": "Melville"}],
        "ISBN": ["0142437247"]
      }]
    }
  })
}

fn crossref(server: &MockServer) -> CrossrefService {
  CrossrefService::new(mock_settings("crossref", server)).unwrap()
}

#[tokio::test]
async fn test_select_true_sends_every_element() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/works"))
    .and(query_param("query.author", "Melville"))
    .and(query_param("select", SELECT_ELEMENTS.join(",")))
    .respond_with(ResponseTemplate::new(200).set_body_json(work_list()))
    .expect(1)
    .mount(&server)
    .await;

  let mut request = LookupRequest::from_terms(["author:Melville"])?;
  request.options.params.insert("select".into(), json!(true));
  let reply = crossref(&server).lookup(&request).await;

  assert!(reply.message.is_ok());
  assert_eq!(reply.message.status, Some(200));
  assert_eq!(reply.items.len(), 1);
  assert_eq!(reply.items[0].title.as_deref(), Some("Moby-Dick"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_bogus_select_field_is_dropped() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/works"))
    .and(query_param("select", "DOI"))
    .respond_with(ResponseTemplate::new(200).set_body_json(work_list()))
    .expect(1)
    .mount(&server)
    .await;

  let mut request = LookupRequest::from_terms(["title:Moby Dick"])?;
  request.options.params.insert("select".into(), json!(["doi", "bogus_field"]));
  let reply = crossref(&server).lookup(&request).await;

  assert!(reply.message.is_ok());
  assert!(logs_contain("Ignoring invalid Crossref select field"));
  Ok(())
}

#[tokio::test]
async fn test_single_doi_fetches_the_work() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/works/10.1000/xyz123"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "status": "ok",
      "message-type": "work",
      "message": {"DOI": "10.1000/xyz123", "title": ["Typee"], "publisher": "John Murray"}
    })))
    .expect(1)
    .mount(&server)
    .await;

  let request = LookupRequest::from_terms(["doi:10.1000/XYZ123"])?;
  let reply = crossref(&server).lookup(&request).await;

  assert_eq!(reply.items.len(), 1);
  assert_eq!(reply.items[0].publisher.as_deref(), Some("John Murray"));
  assert_eq!(reply.items[0].identifiers[0].to_string(), "doi:10.1000/xyz123");
  Ok(())
}

#[tokio::test]
async fn test_doi_with_reserved_characters_stays_in_path() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/works/10.1000/moby%3Fv%232"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "status": "ok",
      "message-type": "work",
      "message": {"DOI": "10.1000/moby?v#2", "title": ["Moby-Dick"]}
    })))
    .expect(1)
    .mount(&server)
    .await;

  let message = crossref(&server).get_work("10.1000/moby?v#2").await;

  assert!(message.exception().is_none(), "{:?}", message.exception());
  assert_eq!(message.api_records().len(), 1);
  Ok(())
}

#[tokio::test]
async fn test_html_body_becomes_exception() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/works"))
    .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Service Unavailable</body></html>"))
    .mount(&server)
    .await;

  let reply = crossref(&server).lookup(&LookupRequest::from_terms(["whale"])?).await;

  assert!(matches!(reply.message.exception, Some(TransportError::Malformed(_))));
  assert_eq!(reply.message.status, Some(200));
  assert!(reply.items.is_empty());
  Ok(())
}

#[tokio::test]
async fn test_error_status_becomes_exception() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/works"))
    .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
    .mount(&server)
    .await;

  let reply = crossref(&server).lookup(&LookupRequest::from_terms(["whale"])?).await;

  match reply.message.exception {
    Some(TransportError::Status { code, body }) => {
      assert_eq!(code, 503);
      assert_eq!(body, "try later");
    },
    other => panic!("expected a status error, got {other:?}"),
  }
  assert_eq!(reply.message.status, Some(503));
  Ok(())
}
