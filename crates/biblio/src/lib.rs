//! Multi-provider bibliographic lookup and schema-driven serialization.
//!
//! `biblio` fans a normalized bibliographic query out to several external catalog services,
//! normalizes their heterogeneous JSON/XML payloads into a common shape and streams the results
//! back to a caller over an envelope channel. It provides:
//!
//! - A declarative schema/serializer framework mapping typed records to and from Hash, JSON, XML
//!   and Obj wire formats with per-format naming, wrapping and empty/nil rendering policy
//! - Typed [`Record`](record::Record) and [`Message`](record::Message) values built atop that
//!   framework
//! - Remote service adapters for Crossref, Google Books, WorldCat, Internet Archive downloads and
//!   AWS S3/BiblioVault object streaming
//! - A lookup orchestrator that queries enabled providers concurrently, each bounded by its own
//!   timeout, and reports progress as `STARTING`/`PARTIAL`/`COMPLETE` envelopes
//!
//! # Getting Started
//!
//! ```no_run
//! use biblio::{
//!   configuration::LookupConfig,
//!   lookup::{LookupJob, LookupRequest, LookupService},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   let config = LookupConfig::load_default()?;
//!   let service = LookupService::from_config(config)?;
//!
//!   let request = LookupRequest::from_terms(["author:Melville", "title:Moby Dick"])?;
//!   let (job_id, receiver) = LookupJob::submit(service, request);
//!   for envelope in LookupJob::collect(receiver).await {
//!     println!("{job_id}: {}", serde_json::to_string(&envelope)?);
//!   }
//!   Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`schema`]: Field declarations, format policies and the (de)serializer
//! - [`record`]: Schema-shaped records and provider messages
//! - [`identifier`]: Typed standard identifiers (ISBN/ISSN/OCLC/LCCN/DOI/UPC)
//! - [`service`]: HTTP plumbing and one adapter per external provider
//! - [`lookup`]: Requests, responses, the orchestrator and the job interface
//! - [`channel`]: Envelope types exchanged with the async channel transport
//! - [`configuration`]: Per-provider settings loaded once at startup
//! - [`prelude`]: Common traits and types for ergonomic imports

#![warn(missing_docs)]

use std::{
  collections::{BTreeMap, HashSet},
  fmt::{self, Display},
  path::{Path, PathBuf},
  str::FromStr,
  sync::Arc,
  time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info, instrument, trace, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod channel;
pub mod configuration;
pub mod error;
pub mod identifier;
pub mod lookup;
pub mod record;
pub mod schema;
pub mod service;

use crate::{configuration::*, error::*, identifier::*, record::*, schema::*};

/// Common traits and types for ergonomic imports.
///
/// ```no_run
/// use biblio::prelude::*;
///
/// fn titles(message: &dyn ApiMessage) -> Vec<String> {
///   message.api_records().iter().filter_map(|r| r.text("title")).collect()
/// }
/// ```
pub mod prelude {
  pub use crate::{
    error::{BiblioError, Result},
    lookup::{LookupAdapter, Normalize},
    record::ApiMessage,
    schema::FormatPolicy,
  };
}
