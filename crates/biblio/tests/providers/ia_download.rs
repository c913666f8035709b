use biblio::service::ia_download::IaDownloadService;
use tempfile::tempdir;

use super::*;

fn archive(server: &MockServer) -> IaDownloadService {
  IaDownloadService::new(mock_settings("ia_download", server)).unwrap()
}

#[tokio::test]
async fn test_probe_states() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/download/pending/pending.epub"))
    .respond_with(
      ResponseTemplate::new(202).set_body_json(json!({"status": "waiting", "message": "Generating EPUB"})),
    )
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/download/ready/ready.epub"))
    .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK".to_vec()))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/download/gone/gone.epub"))
    .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status": "error", "message": "Item not found"})))
    .mount(&server)
    .await;
  let archive = archive(&server);

  let pending = archive.probe("/download/pending/pending.epub").await;
  assert!(pending.waiting && !pending.ready && !pending.error);
  assert_eq!(pending.message.as_deref(), Some("Generating EPUB"));

  let ready = archive.probe("/download/ready/ready.epub").await;
  assert!(ready.ready && !ready.waiting && !ready.error);
  assert_eq!(ready.status, Some(200));

  let gone = archive.probe("/download/gone/gone.epub").await;
  assert!(gone.error && !gone.ready);
  assert_eq!(gone.status, Some(404));
  assert_eq!(gone.message.as_deref(), Some("Item not found"));
  Ok(())
}

#[tokio::test]
async fn test_download_names_file_from_header() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/download/mobydick/mobydick.epub"))
    .respond_with(
      ResponseTemplate::new(200)
        .insert_header("content-disposition", "attachment; filename=\"moby.epub\"; filename*=UTF-8''moby%20dick.epub")
        .set_body_bytes(b"epub bytes".to_vec()),
    )
    .expect(2)
    .mount(&server)
    .await;

  let dir = tempdir()?;
  let written = archive(&server).download("/download/mobydick/mobydick.epub", dir.path()).await?;

  assert_eq!(written, dir.path().join("moby dick.epub"));
  assert_eq!(std::fs::read(&written)?, b"epub bytes");
  Ok(())
}

#[tokio::test]
async fn test_download_while_generating_is_not_ready() -> TestResult<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/download/slow/slow.pdf"))
    .respond_with(ResponseTemplate::new(202).set_body_json(json!({"status": "waiting", "message": "Generating PDF"})))
    .mount(&server)
    .await;

  let dir = tempdir()?;
  let result = archive(&server).download("/download/slow/slow.pdf", dir.path()).await;
  assert!(matches!(result, Err(BiblioError::NotReady(message)) if message == "Generating PDF"));
  assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
  Ok(())
}
