use std::{sync::Arc, time::Duration};

use biblio::{
  channel::{Envelope, Status},
  configuration::{LookupConfig, ServiceSettings},
  error::{BiblioError, TransportError},
  lookup::{LookupJob, LookupReply, LookupRequest, LookupService, ProviderState},
  prelude::*,
};
use serde_json::json;
use tracing_test::traced_test;
use wiremock::{
  matchers::{method, path, query_param},
  Mock, MockServer, ResponseTemplate,
};

mod orchestration;
mod providers;

pub type TestResult<T> = anyhow::Result<T>;

/// Settings for `name` pointed at the mock server.
pub fn mock_settings(name: &str, server: &MockServer) -> ServiceSettings {
  ServiceSettings::new(name, server.uri())
}

/// Statuses of a finished job, in arrival order.
pub fn statuses(envelopes: &[Envelope]) -> Vec<Status> {
  envelopes.iter().map(|envelope| envelope.status).collect()
}
