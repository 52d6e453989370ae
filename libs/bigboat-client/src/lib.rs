//! # boatload-client
//!
//! Client for the BigBoat dashboard API.
//!
//! A dashboard exposes a v1 API to everyone and a v2 API to callers with an
//! API key. Only v2 can register applications, upload compose files and
//! manage instances, so a client built without a key reports
//! [`ApiVersion::V1`] and refuses those operations.
//!
//! ## Endpoints (v2)
//!
//! - `GET|PUT apps/{name}/{version}`
//! - `PUT apps/{name}/{version}/files/{dockerCompose|bigboatCompose}`
//! - `GET|PUT|DELETE instances/{name}`

mod client;
mod error;
mod types;

pub use client::{ApiVersion, Client, DEFAULT_TIMEOUT};
pub use error::ClientError;
pub use types::{App, AppRef, ComposeFile, Instance, InstanceState};
