use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinSet;

use super::*;
use crate::service::{crossref::CrossrefService, google_books::GoogleBooksService, worldcat::WorldcatService};

/// What one adapter returns for one request.
#[derive(Debug, Clone)]
pub struct LookupReply {
  /// The provider message, possibly exception-bearing.
  pub message: Message,
  /// The message's records, normalized.
  pub items:   Vec<LookupItem>,
}

impl LookupReply {
  /// Normalizes a provider message into a reply.
  pub fn from_message<M: Normalize + ?Sized>(message: &M) -> Self {
    let items = if message.exception().is_some() { Vec::new() } else { message.items() };
    Self { message: message.message().clone(), items }
  }
}

/// A search provider the orchestrator can dispatch to.
///
/// [`LookupAdapter::lookup`] never fails: transport problems come back as an exception on the
/// reply's message.
#[async_trait]
pub trait LookupAdapter: Send + Sync {
  /// Resolved settings of the service.
  fn settings(&self) -> &ServiceSettings;

  /// Service name.
  fn name(&self) -> &str { &self.settings().name }

  /// Whether the service can do anything useful with `request`.
  ///
  /// Requests with any non-identifier term are always searchable; identifier-only requests need
  /// at least one identifier type the service supports.
  fn supports(&self, request: &LookupRequest) -> bool {
    let settings = self.settings();
    request.terms().iter().any(|term| match term.kind.identifier_kind() {
      Some(kind) => settings.supports(kind),
      None => true,
    })
  }

  /// Runs the search.
  async fn lookup(&self, request: &LookupRequest) -> LookupReply;
}

/// Fans requests out to adapters and assembles the aggregate.
///
/// # Examples
///
/// ```no_run
/// use biblio::{
///   configuration::LookupConfig,
///   lookup::{LookupRequest, LookupService},
/// };
///
/// # async fn run() -> biblio::error::Result<()> {
/// let service = LookupService::from_config("[defaults]\ndeadline = 5.0".parse::<LookupConfig>()?)?;
/// let response = service.lookup(&LookupRequest::from_terms(["doi:10.1000/xyz123"])?).await?;
/// for provider in &response.providers {
///   println!("{}: {:?} ({} items)", provider.service, provider.state, provider.items.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LookupService {
  adapters: Vec<Arc<dyn LookupAdapter>>,
  deadline: Duration,
}

impl fmt::Debug for LookupService {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LookupService")
      .field("adapters", &self.adapters.iter().map(|a| a.name().to_string()).collect::<Vec<_>>())
      .field("deadline", &self.deadline)
      .finish()
  }
}

impl LookupService {
  /// An orchestrator over the given adapters.
  pub fn new(adapters: Vec<Arc<dyn LookupAdapter>>, deadline: Duration) -> Self {
    Self { adapters, deadline }
  }

  /// Builds the Crossref, Google Books and WorldCat adapters from configuration.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Configuration`] for an invalid configuration, or
  /// [`BiblioError::Network`] if an HTTP client cannot be created.
  pub fn from_config(config: LookupConfig) -> Result<Self> {
    config.validate()?;
    let adapters: Vec<Arc<dyn LookupAdapter>> = vec![
      Arc::new(CrossrefService::new(config.service(CROSSREF)?)?),
      Arc::new(GoogleBooksService::new(config.service(GOOGLE_BOOKS)?)?),
      Arc::new(WorldcatService::new(config.service(WORLDCAT)?)?),
    ];
    Ok(Self::new(adapters, config.deadline()))
  }

  /// Registered adapters.
  pub fn adapters(&self) -> &[Arc<dyn LookupAdapter>] { &self.adapters }

  /// Default overall deadline.
  pub fn deadline(&self) -> Duration { self.deadline }

  /// Picks the adapters for `request`.
  ///
  /// Explicitly requested services must exist, be enabled and support the request. Without an
  /// explicit list every enabled adapter that supports the request is used.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::Configuration`] for an unknown, disabled or unsupported explicit
  /// service, or when no adapter can serve the request.
  pub fn select(&self, request: &LookupRequest) -> Result<Vec<Arc<dyn LookupAdapter>>> {
    let selected: Vec<Arc<dyn LookupAdapter>> = match &request.options.services {
      Some(names) => names
        .iter()
        .map(|name| {
          let adapter = self
            .adapters
            .iter()
            .find(|adapter| adapter.name() == name)
            .ok_or_else(|| BiblioError::Configuration(format!("unknown service '{name}'")))?;
          if !adapter.settings().enabled {
            return Err(BiblioError::Configuration(format!("service '{name}' is disabled")));
          }
          if !adapter.supports(request) {
            return Err(BiblioError::Configuration(format!(
              "service '{name}' supports none of the requested identifier types"
            )));
          }
          Ok(Arc::clone(adapter))
        })
        .collect::<Result<_>>()?,
      None => self
        .adapters
        .iter()
        .filter(|adapter| adapter.settings().enabled && adapter.supports(request))
        .cloned()
        .collect(),
    };
    if selected.is_empty() {
      return Err(BiblioError::Configuration("no enabled service supports this request".to_string()));
    }
    Ok(selected)
  }

  /// Runs a lookup without reporting progress.
  ///
  /// # Errors
  ///
  /// Fails only for invalid input; see [`LookupService::run`].
  pub async fn lookup(&self, request: &LookupRequest) -> Result<LookupResponse> {
    self.run(Uuid::new_v4(), request, None).await
  }

  /// Runs a lookup, sending envelopes to `sender` as providers finish.
  ///
  /// Emits one `STARTING`, one `PARTIAL` per provider that answers successfully and finally one
  /// `COMPLETE` carrying the whole [`LookupResponse`], even when every provider failed. Invalid
  /// input produces a single `ERROR` envelope instead.
  ///
  /// # Errors
  ///
  /// Returns [`BiblioError::InvalidRequest`] for a request without terms and
  /// [`BiblioError::Configuration`] when no usable service can be selected. Provider failures are
  /// never returned; they are recorded on the response.
  #[instrument(skip(self, request, sender), fields(job = %job_id), level = "debug")]
  pub async fn run(
    &self,
    job_id: Uuid,
    request: &LookupRequest,
    sender: Option<mpsc::Sender<Envelope>>,
  ) -> Result<LookupResponse> {
    let reporter = Reporter { sender, job_id, user: request.options.user.clone() };
    let started = Instant::now();

    let adapters = match request.validate().and_then(|()| self.select(request)) {
      Ok(adapters) => adapters,
      Err(error) => {
        warn!(error = %error, "Rejecting lookup");
        let envelope =
          Envelope::new(Status::Error).class("LookupError").data(json!({ "error": error.to_string() }));
        reporter.send(envelope).await;
        return Err(error);
      },
    };

    let names: Vec<String> = adapters.iter().map(|adapter| adapter.name().to_string()).collect();
    info!(services = ?names, terms = request.terms().len(), "Starting lookup");
    reporter.send(Envelope::new(Status::Starting).services(names.clone()).class("LookupResponse")).await;

    let mut response = LookupResponse::new(
      adapters.iter().map(|a| ProviderResult::pending(a.name(), a.settings().priority)).collect(),
    );
    response.dispatch();

    let deadline = request.options.deadline.unwrap_or(self.deadline);
    let request = Arc::new(request.clone());
    let mut tasks = JoinSet::new();
    for adapter in adapters {
      let request = Arc::clone(&request);
      let timeout = request.options.timeout.unwrap_or(adapter.settings().timeout);
      tasks.spawn(async move {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(tokio::time::timeout(timeout, adapter.lookup(&request)))
          .catch_unwind()
          .await;
        let outcome = match outcome {
          Ok(Ok(reply)) => Ok(reply),
          Ok(Err(_)) => Err(
            BiblioError::ProviderTimeout { service: adapter.name().to_string(), timeout }.to_string(),
          ),
          Err(_) => Err(format!("{} adapter panicked", adapter.name())),
        };
        (adapter.name().to_string(), outcome, started.elapsed())
      });
    }

    let now = tokio::time::Instant::now();
    let expires_at = now.checked_add(deadline).unwrap_or_else(|| now + MAX_WAIT);
    loop {
      match tokio::time::timeout_at(expires_at, tasks.join_next()).await {
        Ok(Some(Ok((service, Ok(reply), elapsed)))) => match reply.message.exception {
          Some(exception) => {
            warn!(service = %service, error = %exception, "Provider failed");
            response.fail(&service, reply.message.status, Some(elapsed), exception.to_string());
          },
          None => {
            debug!(service = %service, items = reply.items.len(), elapsed_ms = elapsed.as_millis() as u64, "Provider completed");
            let data = serde_json::to_value(&reply.items).unwrap_or_else(|_| json!([]));
            response.complete(&service, reply.message.status, elapsed, reply.items);
            reporter
              .send(
                Envelope::new(Status::Partial)
                  .service(service)
                  .class("LookupItem")
                  .duration(elapsed)
                  .data(data),
              )
              .await;
          },
        },
        Ok(Some(Ok((service, Err(reason), elapsed)))) => {
          warn!(service = %service, reason = %reason, "Provider failed");
          response.fail(&service, None, Some(elapsed), reason);
        },
        Ok(Some(Err(error))) => warn!(error = %error, "Provider task ended abnormally"),
        Ok(None) => break,
        Err(_) => {
          tasks.abort_all();
          let reason = BiblioError::AggregateTimeout(deadline).to_string();
          let expired = response.expire(&reason);
          warn!(services = ?expired, deadline_ms = deadline.as_millis() as u64, "Lookup deadline elapsed");
          break;
        },
      }
    }

    // Tasks that ended abnormally never reported back.
    let unaccounted = response.expire("provider task ended without a result");
    if !unaccounted.is_empty() {
      warn!(services = ?unaccounted, "Providers ended without a result");
    }

    let elapsed = started.elapsed();
    info!(
      completed = response.completed().count(),
      failed = response.failed().count(),
      items = response.count(),
      elapsed_ms = elapsed.as_millis() as u64,
      "Lookup finished"
    );
    let data = serde_json::to_value(&response).unwrap_or_else(|_| json!({}));
    let mut complete =
      Envelope::new(Status::Complete).services(names).class("LookupResponse").duration(elapsed).data(data);
    complete.count = Some(response.count());
    reporter.send(complete).await;

    Ok(response)
  }
}

/// Stamps envelopes with the job id and user and forwards them, if anyone is listening.
struct Reporter {
  sender: Option<mpsc::Sender<Envelope>>,
  job_id: Uuid,
  user:   Option<String>,
}

impl Reporter {
  async fn send(&self, envelope: Envelope) {
    let Some(sender) = &self.sender else { return };
    let envelope = envelope.job(self.job_id).user(self.user.clone());
    trace!(status = %envelope.status, "Sending envelope");
    if sender.send(envelope).await.is_err() {
      debug!("Envelope receiver dropped");
    }
  }
}
