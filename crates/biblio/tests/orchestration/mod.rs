use std::time::Instant;

use biblio::{
  identifier::Identifier,
  lookup::{LookupItem, LookupState},
  record::Message,
  schema::{define_schema, Field},
  service::worldcat::SRU_PATH,
};

use super::*;

enum Behavior {
  Answer,
  Panic,
}

/// Answers after `delay` with one item titled after the adapter.
struct Scripted {
  settings: ServiceSettings,
  delay:    Duration,
  behavior: Behavior,
}

#[async_trait::async_trait]
impl LookupAdapter for Scripted {
  fn settings(&self) -> &ServiceSettings { &self.settings }

  async fn lookup(&self, _request: &LookupRequest) -> LookupReply {
    tokio::time::sleep(self.delay).await;
    if let Behavior::Panic = self.behavior {
      panic!("adapter blew up");
    }
    let schema = define_schema("scripted", vec![Field::text("title")]).unwrap();
    LookupReply {
      message: Message::new(self.name(), biblio::record::Record::new(&schema)),
      items:   vec![LookupItem::new(self.name()).title(format!("{} result", self.name()))],
    }
  }
}

fn scripted(name: &str, priority: u32, delay_ms: u64, timeout_ms: u64) -> Arc<dyn LookupAdapter> {
  let mut settings = ServiceSettings::new(name, "http://localhost");
  settings.priority = priority;
  settings.timeout = Duration::from_millis(timeout_ms);
  Arc::new(Scripted { settings, delay: Duration::from_millis(delay_ms), behavior: Behavior::Answer })
}

fn exploding(name: &str) -> Arc<dyn LookupAdapter> {
  Arc::new(Scripted {
    settings: ServiceSettings::new(name, "http://localhost"),
    delay:    Duration::from_millis(5),
    behavior: Behavior::Panic,
  })
}

#[tokio::test]
async fn test_one_start_one_complete_per_job() -> TestResult<()> {
  let service = LookupService::new(
    vec![scripted("alpha", 1, 10, 1_000), scripted("beta", 2, 50, 1_000), scripted("gamma", 3, 500, 30)],
    Duration::from_secs(2),
  );
  let (job_id, receiver) = LookupJob::submit(service, LookupRequest::from_terms(["Typee"])?);
  let envelopes = LookupJob::collect(receiver).await;

  assert_eq!(
    statuses(&envelopes),
    vec![Status::Starting, Status::Partial, Status::Partial, Status::Complete]
  );
  assert!(envelopes.iter().all(|envelope| envelope.job_id == Some(job_id)));
  for envelope in &envelopes {
    let wire = serde_json::to_value(envelope)?;
    assert!(wire["class"].is_string(), "{wire}");
    assert!(wire["time"].is_string(), "{wire}");
  }
  assert_eq!(envelopes[0].class.as_deref(), Some("LookupResponse"));
  assert_eq!(envelopes[0].service_names(), vec!["alpha", "beta", "gamma"]);
  assert_eq!(envelopes[1].service_names(), vec!["alpha"]);
  assert_eq!(envelopes[2].service_names(), vec!["beta"]);

  let complete = envelopes.last().unwrap();
  assert_eq!(complete.count, Some(2));
  let data = complete.data.as_ref().unwrap();
  assert_eq!(data["state"], "DONE");
  assert_eq!(data["providers"][2]["service"], "gamma");
  assert_eq!(data["providers"][2]["state"], "FAILED");
  assert!(data["providers"][2]["reason"].as_str().unwrap().contains("timed out"));
  Ok(())
}

#[tokio::test]
async fn test_deadline_expires_stragglers() -> TestResult<()> {
  let service = LookupService::new(
    vec![scripted("quick", 1, 10, 5_000), scripted("sluggish", 2, 2_000, 5_000)],
    Duration::from_millis(150),
  );
  let started = Instant::now();
  let response = service.lookup(&LookupRequest::from_terms(["Omoo"])?).await?;

  assert!(started.elapsed() < Duration::from_secs(1));
  assert_eq!(response.state, LookupState::Done);
  assert!(response.provider("quick").unwrap().is_completed());
  let sluggish = response.provider("sluggish").unwrap();
  assert!(matches!(&sluggish.state, ProviderState::Failed(reason) if reason.contains("deadline")));
  assert!(sluggish.items.is_empty());
  assert_eq!(response.count(), 1);
  Ok(())
}

#[tokio::test]
async fn test_request_deadline_overrides_service_default() -> TestResult<()> {
  let service =
    LookupService::new(vec![scripted("sluggish", 1, 400, 5_000)], Duration::from_secs(10));
  let mut request = LookupRequest::from_terms(["Mardi"])?;
  request.options.deadline = Some(Duration::from_millis(50));

  let response = service.lookup(&request).await?;
  assert_eq!(response.failed().count(), 1);
  Ok(())
}

#[tokio::test]
async fn test_unbounded_deadline_still_completes() -> TestResult<()> {
  let service = LookupService::new(vec![scripted("alpha", 1, 5, 1_000)], Duration::from_secs(1));
  let mut request = LookupRequest::from_terms(["Redburn"])?;
  request.options.deadline = Some(Duration::from_secs(u64::MAX));

  let (_, receiver) = LookupJob::submit(service, request);
  let envelopes = LookupJob::collect(receiver).await;
  assert_eq!(statuses(&envelopes), vec![Status::Starting, Status::Partial, Status::Complete]);
  Ok(())
}

#[tokio::test]
async fn test_oversized_channel_deadline_is_an_error_envelope() -> TestResult<()> {
  let service = LookupService::new(vec![scripted("alpha", 1, 5, 1_000)], Duration::from_secs(1));
  for options in [r#"{"deadline": 1e19}"#, r#"{"deadline": 1e20}"#] {
    let message = biblio::channel::ChannelRequest::from_json(&format!(
      r#"{{"terms": "title:Redburn", "options": {options}}}"#
    ))?;
    let (_, receiver) = LookupJob::submit_channel(service.clone(), message);
    let envelopes = LookupJob::collect(receiver).await;
    assert_eq!(statuses(&envelopes), vec![Status::Error], "{options}");
  }
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_panicking_adapter_fails_alone() -> TestResult<()> {
  let service =
    LookupService::new(vec![scripted("steady", 1, 5, 1_000), exploding("fragile")], Duration::from_secs(1));
  let response = service.lookup(&LookupRequest::from_terms(["Pierre"])?).await?;

  assert!(response.provider("steady").unwrap().is_completed());
  assert!(response.provider("fragile").unwrap().failure().unwrap().contains("panicked"));
  assert!(logs_contain("Provider failed"));
  Ok(())
}

#[tokio::test]
async fn test_channel_message_round_trip() -> TestResult<()> {
  let service = LookupService::new(vec![scripted("alpha", 1, 5, 1_000)], Duration::from_secs(1));
  let message = biblio::channel::ChannelRequest::from_json(
    r#"{"terms": ["author:Melville", "title:Typee"], "options": {"user": "ishmael", "timeout": 0.5}}"#,
  )?;
  let (_, receiver) = LookupJob::submit_channel(service, message);
  let envelopes = LookupJob::collect(receiver).await;

  assert_eq!(statuses(&envelopes), vec![Status::Starting, Status::Partial, Status::Complete]);
  assert!(envelopes.iter().all(|envelope| envelope.user.as_deref() == Some("ishmael")));
  let wire = serde_json::to_value(&envelopes[1])?;
  assert_eq!(wire["status"], "PARTIAL");
  assert_eq!(wire["class"], "LookupItem");
  assert_eq!(wire["data"][0]["title"], "alpha result");
  Ok(())
}

#[tokio::test]
async fn test_configured_providers_against_mock_server() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/works"))
    .and(query_param("filter", "isbn:9780142437247"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "status": "ok",
      "message-type": "work-list",
      "message": {"items": [{"DOI": "10.1000/moby", "title": ["Moby-Dick"], "ISBN": ["9780142437247"]}]}
    })))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/books/v1/volumes"))
    .and(query_param("q", "isbn:9780142437247"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "totalItems": 1,
      "items": [{"volumeInfo": {
        "title": "Moby Dick",
        "industryIdentifiers": [{"type": "ISBN_13", "identifier": "9780142437247"}]
      }}]
    })))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path(SRU_PATH))
    .respond_with(ResponseTemplate::new(200).set_body_string(
      r#"<searchRetrieveResponse><numberOfRecords>1</numberOfRecords><records><record>
        <recordData><oclcdcs>
          <dc:title>Moby Dick, or, The Whale</dc:title>
          <dc:identifier>9780142437247</dc:identifier>
        </oclcdcs></recordData>
      </record></records></searchRetrieveResponse>"#,
    ))
    .mount(&server)
    .await;

  let uri = server.uri();
  let config: LookupConfig = format!(
    r#"
    [defaults]
    deadline = 5.0

    [services.crossref]
    base_url = "{uri}"

    [services.google_books]
    base_url = "{uri}"

    [services.worldcat]
    base_url = "{uri}"
    "#
  )
  .parse()?;
  let service = LookupService::from_config(config)?;
  let response = service.lookup(&LookupRequest::from_terms(["0142437247"])?).await?;

  assert_eq!(response.completed().count(), 3, "{response:#?}");
  let isbn = Identifier::parse("isbn:9780142437247")?;
  let grouped = response.by_identifier();
  let services: Vec<&str> = grouped[&isbn].iter().map(|item| item.service.as_str()).collect();
  assert_eq!(services, vec!["crossref", "google_books", "worldcat"]);
  Ok(())
}

#[tokio::test]
async fn test_invalid_request_is_rejected() {
  let service = LookupService::new(vec![scripted("alpha", 1, 5, 1_000)], Duration::from_secs(1));
  let (_, receiver) = LookupJob::submit(service.clone(), LookupRequest::default());
  let envelopes = LookupJob::collect(receiver).await;
  assert_eq!(statuses(&envelopes), vec![Status::Error]);
  assert_eq!(envelopes[0].class.as_deref(), Some("LookupError"));
  assert!(serde_json::to_value(&envelopes[0]).unwrap()["class"].is_string());

  let result = service.lookup(&LookupRequest::from_terms(["isbn:0142437247"]).unwrap()).await;
  tokio_test::assert_err!(&result);
  assert!(matches!(result, Err(BiblioError::Configuration(_))));
}
