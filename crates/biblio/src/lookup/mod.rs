//! Provider-agnostic lookup requests and the orchestrator that fans them out.
//!
//! A [`LookupRequest`] is an ordered, de-duplicated set of typed [`SearchTerm`]s plus
//! [`LookupOptions`]. The [`LookupService`] selects the adapters able to serve it, runs them
//! concurrently (each bounded by its own timeout, all bounded by an overall deadline) and
//! assembles a [`LookupResponse`] as they finish. [`LookupJob`] wraps a run in a Tokio task that
//! streams [`Envelope`](crate::channel::Envelope)s to a receiver.
//!
//! Provider results are normalized into [`LookupItem`]s through the [`Normalize`] trait, so the
//! aggregate never depends on a provider's wire shape.

use std::time::Instant;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::*;
use crate::channel::{ChannelRequest, Envelope, Status};

mod item;
mod job;
mod orchestrator;
mod request;
mod response;

pub use self::{item::*, job::*, orchestrator::*, request::*, response::*};
