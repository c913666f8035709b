use super::*;

/// Envelopes buffered per job before the orchestrator waits on the receiver.
const CHANNEL_CAPACITY: usize = 64;

/// "Submit an async task, receive its results" interface over [`LookupService`].
///
/// # Examples
///
/// ```no_run
/// use biblio::{
///   channel::Status,
///   configuration::LookupConfig,
///   lookup::{LookupJob, LookupRequest, LookupService},
/// };
///
/// # async fn run() -> biblio::error::Result<()> {
/// let service = LookupService::from_config(LookupConfig::default())?;
/// let (job_id, receiver) = LookupJob::submit(service, LookupRequest::from_terms(["Typee"])?);
/// let envelopes = LookupJob::collect(receiver).await;
/// assert_eq!(envelopes.last().map(|e| e.status), Some(Status::Complete));
/// assert!(envelopes.iter().all(|e| e.job_id == Some(job_id)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LookupJob;

impl LookupJob {
  /// Spawns the lookup on the Tokio runtime and returns its id with the envelope receiver.
  ///
  /// Must be called from within a Tokio runtime.
  pub fn submit(
    service: impl Into<Arc<LookupService>>,
    request: LookupRequest,
  ) -> (Uuid, mpsc::Receiver<Envelope>) {
    let service = service.into();
    let job_id = Uuid::new_v4();
    let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
    debug!(job = %job_id, "Submitting lookup job");
    tokio::spawn(async move {
      if let Err(error) = service.run(job_id, &request, Some(sender)).await {
        debug!(job = %job_id, error = %error, "Lookup job rejected");
      }
    });
    (job_id, receiver)
  }

  /// Submits an inbound channel message. A message that does not parse into a request yields a
  /// receiver holding a single `ERROR` envelope.
  pub fn submit_channel(
    service: impl Into<Arc<LookupService>>,
    message: ChannelRequest,
  ) -> (Uuid, mpsc::Receiver<Envelope>) {
    let user = message.options.user.clone();
    match message.into_request() {
      Ok(request) => Self::submit(service, request),
      Err(error) => {
        let job_id = Uuid::new_v4();
        warn!(job = %job_id, error = %error, "Rejecting channel request");
        let (sender, receiver) = mpsc::channel(1);
        let envelope = Envelope::new(Status::Error)
          .class("LookupError")
          .job(job_id)
          .user(user)
          .data(json!({ "error": error.to_string() }));
        if sender.try_send(envelope).is_err() {
          debug!(job = %job_id, "Envelope receiver dropped");
        }
        (job_id, receiver)
      },
    }
  }

  /// Drains `receiver` up to and including the terminal envelope.
  pub async fn collect(mut receiver: mpsc::Receiver<Envelope>) -> Vec<Envelope> {
    let mut envelopes = Vec::new();
    while let Some(envelope) = receiver.recv().await {
      let terminal = envelope.status.is_terminal();
      envelopes.push(envelope);
      if terminal {
        break;
      }
    }
    envelopes
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_invalid_channel_request_yields_error_envelope() {
    let service = LookupService::new(Vec::new(), Duration::from_secs(1));
    let message = ChannelRequest::from_json(r#"{"terms": "isbn:123", "options": {"user": "ada"}}"#).unwrap();
    let (job_id, receiver) = LookupJob::submit_channel(service, message);

    let envelopes = LookupJob::collect(receiver).await;
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].status, Status::Error);
    assert_eq!(envelopes[0].job_id, Some(job_id));
    assert_eq!(envelopes[0].user.as_deref(), Some("ada"));
    assert_eq!(envelopes[0].class.as_deref(), Some("LookupError"));
  }

  #[tokio::test]
  async fn test_no_services_is_an_error_job() {
    let service = LookupService::new(Vec::new(), Duration::from_secs(1));
    let (_, receiver) = LookupJob::submit(service, LookupRequest::from_terms(["Typee"]).unwrap());
    let envelopes = LookupJob::collect(receiver).await;
    assert_eq!(envelopes.iter().map(|e| e.status).collect::<Vec<_>>(), vec![Status::Error]);
  }
}
