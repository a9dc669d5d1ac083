//! # xero-command
//!
//! A command-dispatched client for the Xero accounting API, for OAuth 1.0a
//! private applications.
//!
//! Commands are looked up by name (`"invoices"`, `"Contacts"`, ...) in a fixed
//! resource table, checked against the HTTP methods each resource supports,
//! turned into a request and handed to an [`OAuthTransport`] for signing and
//! sending. The OAuth token triple is persisted to a [`SessionStore`] between
//! calls.
//!
//! ```ignore
//! use xero_command::{Argument, Client, ReqwestTransport};
//!
//! let transport = ReqwestTransport::new()?.with_signer(my_rsa_sha1_signer);
//! let client = Client::builder()
//!     .consumer_key("CONSUMER_KEY")
//!     .shared_secret("SHARED_SECRET")
//!     .alias("@app", "/srv/app")
//!     .format("json")
//!     .build(transport)?;
//!
//! // Positional form: method, id, modified-since, filters.
//! let recent = client
//!     .invoke("Invoices", vec!["GET".into(), Argument::Empty, "2024-01-15 10:00:00".into()])
//!     .await?;
//!
//! // Typed form.
//! let contact = client.contacts().get("CONTACT-ID").await?;
//! ```
//!
//! ## Sentry Integration
//!
//! Errors carry a span trace when they are created inside an instrumented
//! span. Install `tracing_error::ErrorLayer` to capture it, and enable the
//! `sentry` feature to convert errors into breadcrumbs:
//!
//! ```ignore
//! use tracing_subscriber::prelude::*;
//! use tracing_error::ErrorLayer;
//!
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(ErrorLayer::default())  // Required for SpanTrace capture
//!     .with(sentry::integrations::tracing::layer())
//!     .init();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
extern crate tracing;

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod oauth;
pub mod request;
pub mod session;
pub mod transport;
pub mod utils;

#[cfg(feature = "sentry")]
pub mod sentry_integration;

pub use client::{Client, ClientBuilder, ResourceApi};
pub use config::{CredentialDefaults, Credentials, PathAliases, ResponseFormat};
pub use endpoints::{ApiSet, Command, HttpMethod, ResourceDescriptor};
pub use error::{Error, Result};
pub use oauth::{OAuthConfig, OAuthTransport, ParsedResponse, TransportResponse};
pub use request::{Argument, DeleteRequest, GetRequest, Payload, RequestSpec, WriteRequest};
pub use session::{FileSessionStore, MemorySessionStore, OAuthSession, SessionError, SessionStore};
pub use transport::{ReqwestTransport, RequestSigner, SigningRequest};

// Re-export SpanTrace for users who want to access it
pub use tracing_error::SpanTrace;
