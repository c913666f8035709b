use biblio::{identifier::Identifier, service::google_books::GoogleBooksService};

use super::*;

// Google matching on LCCN without listing it is observed behavior, not a documented guarantee;
// this may change with the provider's API version.
#[tokio::test]
async fn test_searched_lccn_comes_first() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/books/v1/volumes"))
    .and(query_param("q", "lccn:0123456"))
    .and(query_param("key", "secret"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "kind": "books#volumes",
      "totalItems": 1,
      "items": [{
        "id": "zyTCAlFPjgYC",
        "volumeInfo": {
          "title": "Moby Dick",
          "authors": ["Herman Melville"],
          "industryIdentifiers": [
            {"type": "ISBN_10", "identifier": "0142437247"},
            {"type": "OTHER", "identifier": "UOM:39015"}
          ]
        }
      }]
    })))
    .expect(1)
    .mount(&server)
    .await;

  let mut settings = mock_settings("google_books", &server);
  settings.api_key = Some("secret".to_string());
  let google = GoogleBooksService::new(settings)?;
  let reply = google.lookup(&LookupRequest::from_terms(["lccn:0123456"])?).await;

  assert_eq!(reply.items.len(), 1);
  let item = &reply.items[0];
  assert_eq!(item.identifiers[0], Identifier::parse("lccn:0123456")?);
  assert!(item.has_identifier(&Identifier::parse("isbn:0142437247")?));
  assert_eq!(item.creators, vec!["Herman Melville"]);
  Ok(())
}

#[tokio::test]
async fn test_no_results() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/books/v1/volumes"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "books#volumes", "totalItems": 0})))
    .mount(&server)
    .await;

  let google = GoogleBooksService::new(mock_settings("google_books", &server))?;
  let reply = google.lookup(&LookupRequest::from_terms(["title:Nonexistent Book"])?).await;
  assert!(reply.message.is_ok());
  assert!(reply.items.is_empty());
  Ok(())
}
