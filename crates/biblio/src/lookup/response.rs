use super::*;

/// Overall state of one lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LookupState {
  /// No provider has finished yet.
  Pending,
  /// At least one provider has finished.
  Partial,
  /// Every provider finished, or the deadline elapsed.
  Done,
}

/// State of one provider within a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderState {
  /// Selected but not yet dispatched.
  Pending,
  /// Request sent, no answer yet.
  InFlight,
  /// Answered successfully.
  Completed,
  /// Failed, timed out or was cut off by the deadline.
  Failed(String),
}

impl ProviderState {
  /// Whether the provider is done.
  pub fn is_terminal(&self) -> bool { matches!(self, Self::Completed | Self::Failed(_)) }
}

fn serialize_seconds<S>(elapsed: &Option<Duration>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where S: serde::Serializer {
  match elapsed {
    Some(elapsed) => serializer.serialize_f64(elapsed.as_secs_f64()),
    None => serializer.serialize_none(),
  }
}

/// One provider's share of a lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResult {
  /// Provider name.
  pub service:  String,
  /// Provider priority (lower is more authoritative).
  pub priority: u32,
  /// Provider state.
  #[serde(flatten)]
  pub state:    ProviderState,
  /// Time the provider took.
  #[serde(rename = "duration", serialize_with = "serialize_seconds", skip_serializing_if = "Option::is_none")]
  pub elapsed:  Option<Duration>,
  /// HTTP status of the provider's response.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status:   Option<u16>,
  /// Normalized results.
  pub items:    Vec<LookupItem>,
}

impl ProviderResult {
  /// A provider that has not been dispatched.
  pub fn pending(service: impl Into<String>, priority: u32) -> Self {
    Self {
      service: service.into(),
      priority,
      state: ProviderState::Pending,
      elapsed: None,
      status: None,
      items: Vec::new(),
    }
  }

  /// Whether the provider answered successfully.
  pub fn is_completed(&self) -> bool { self.state == ProviderState::Completed }

  /// The failure reason, if the provider failed.
  pub fn failure(&self) -> Option<&str> {
    match &self.state {
      ProviderState::Failed(reason) => Some(reason),
      _ => None,
    }
  }
}

/// Aggregate result of one lookup.
///
/// Providers are kept in priority order. Items of failed providers are never included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResponse {
  /// Overall state.
  pub state:     LookupState,
  /// Per-provider results.
  pub providers: Vec<ProviderResult>,
}

impl LookupResponse {
  /// A pending response for the given providers.
  pub fn new(mut providers: Vec<ProviderResult>) -> Self {
    providers.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.service.cmp(&b.service)));
    Self { state: LookupState::Pending, providers }
  }

  /// One provider's result.
  pub fn provider(&self, service: &str) -> Option<&ProviderResult> {
    self.providers.iter().find(|provider| provider.service == service)
  }

  pub(crate) fn provider_mut(&mut self, service: &str) -> Option<&mut ProviderResult> {
    self.providers.iter_mut().find(|provider| provider.service == service)
  }

  /// Marks every pending provider in flight.
  pub(crate) fn dispatch(&mut self) {
    for provider in &mut self.providers {
      if provider.state == ProviderState::Pending {
        provider.state = ProviderState::InFlight;
      }
    }
  }

  /// Records a successful provider.
  pub(crate) fn complete(
    &mut self,
    service: &str,
    status: Option<u16>,
    elapsed: Duration,
    items: Vec<LookupItem>,
  ) {
    if let Some(provider) = self.provider_mut(service) {
      provider.state = ProviderState::Completed;
      provider.status = status;
      provider.elapsed = Some(elapsed);
      provider.items = items;
    }
    self.refresh();
  }

  /// Records a failed provider.
  pub(crate) fn fail(
    &mut self,
    service: &str,
    status: Option<u16>,
    elapsed: Option<Duration>,
    reason: impl Into<String>,
  ) {
    if let Some(provider) = self.provider_mut(service) {
      provider.state = ProviderState::Failed(reason.into());
      provider.status = status;
      provider.elapsed = elapsed;
      provider.items.clear();
    }
    self.refresh();
  }

  /// Fails every provider still in flight and closes the lookup. Returns the providers cut off.
  pub(crate) fn expire(&mut self, reason: &str) -> Vec<String> {
    let mut expired = Vec::new();
    for provider in &mut self.providers {
      if !provider.state.is_terminal() {
        provider.state = ProviderState::Failed(reason.to_string());
        provider.items.clear();
        expired.push(provider.service.clone());
      }
    }
    self.state = LookupState::Done;
    expired
  }

  fn refresh(&mut self) {
    self.state = if self.providers.iter().all(|p| p.state.is_terminal()) {
      LookupState::Done
    } else if self.providers.iter().any(|p| p.state.is_terminal()) {
      LookupState::Partial
    } else {
      LookupState::Pending
    };
  }

  /// Providers that answered successfully.
  pub fn completed(&self) -> impl Iterator<Item = &ProviderResult> {
    self.providers.iter().filter(|provider| provider.is_completed())
  }

  /// Providers that failed.
  pub fn failed(&self) -> impl Iterator<Item = &ProviderResult> {
    self.providers.iter().filter(|provider| provider.failure().is_some())
  }

  /// Every item of every completed provider, in priority order.
  pub fn items(&self) -> Vec<&LookupItem> {
    self.completed().flat_map(|provider| provider.items.iter()).collect()
  }

  /// Items grouped under each identifier they carry. Within a group, copies are ordered by
  /// provider priority, so the first copy is the authoritative one.
  ///
  /// # Examples
  ///
  /// ```
  /// use biblio::lookup::LookupResponse;
  ///
  /// let response = LookupResponse::default();
  /// assert!(response.by_identifier().is_empty());
  /// ```
  pub fn by_identifier(&self) -> BTreeMap<Identifier, Vec<&LookupItem>> {
    let mut groups: BTreeMap<Identifier, Vec<&LookupItem>> = BTreeMap::new();
    for item in self.items() {
      for identifier in &item.identifiers {
        groups.entry(identifier.clone()).or_default().push(item);
      }
    }
    groups
  }

  /// Total number of items across completed providers.
  pub fn count(&self) -> usize { self.completed().map(|provider| provider.items.len()).sum() }
}

impl Default for LookupResponse {
  fn default() -> Self { Self::new(Vec::new()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(service: &str, isbn: &str) -> LookupItem {
    let mut item = LookupItem::new(service).title(format!("from {service}"));
    item.add_identifier_value(IdentifierKind::Isbn, isbn);
    item
  }

  #[test]
  fn test_state_transitions() {
    let mut response =
      LookupResponse::new(vec![ProviderResult::pending("b", 2), ProviderResult::pending("a", 1)]);
    assert_eq!(response.providers[0].service, "a");
    response.dispatch();
    assert_eq!(response.state, LookupState::Pending);
    assert_eq!(response.provider("a").unwrap().state, ProviderState::InFlight);

    response.complete("a", Some(200), Duration::from_millis(10), vec![item("a", "0142437247")]);
    assert_eq!(response.state, LookupState::Partial);

    let expired = response.expire("deadline");
    assert_eq!(expired, vec!["b".to_string()]);
    assert_eq!(response.state, LookupState::Done);
    assert_eq!(response.provider("b").unwrap().failure(), Some("deadline"));
    assert_eq!(response.count(), 1);
  }

  #[test]
  fn test_by_identifier_orders_by_priority() {
    let mut response =
      LookupResponse::new(vec![ProviderResult::pending("worldcat", 3), ProviderResult::pending("crossref", 1)]);
    response.dispatch();
    response.complete("worldcat", None, Duration::ZERO, vec![item("worldcat", "0142437247")]);
    response.complete("crossref", None, Duration::ZERO, vec![item("crossref", "978-0-14-243724-7")]);

    let groups = response.by_identifier();
    let isbn = Identifier::parse("isbn:9780142437247").unwrap();
    let copies = &groups[&isbn];
    assert_eq!(copies.len(), 2);
    assert_eq!(copies[0].service, "crossref");
  }

  #[test]
  fn test_failed_provider_serialization() {
    let mut response = LookupResponse::new(vec![ProviderResult::pending("crossref", 1)]);
    response.dispatch();
    response.fail("crossref", Some(503), None, "HTTP 503: busy");
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["state"], json!("DONE"));
    assert_eq!(value["providers"][0]["state"], json!("FAILED"));
    assert_eq!(value["providers"][0]["reason"], json!("HTTP 503: busy"));
    assert_eq!(value["providers"][0]["status"], json!(503));
  }
}
