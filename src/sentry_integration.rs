//! Reporting of dispatch errors to Sentry, behind the `sentry` feature:
//!
//! ```toml
//! [dependencies]
//! xero-command = { version = "0.1", features = ["sentry"] }
//! ```

use std::collections::BTreeMap;

use sentry_core::{Breadcrumb, protocol::Value};

use crate::error::Error;

/// Longest response body copied into Sentry context.
const BODY_PREVIEW_LEN: usize = 500;

/// Convert an xero-command Error into a Sentry breadcrumb.
impl<'a> From<&'a Error> for Breadcrumb {
    fn from(error: &'a Error) -> Self {
        let (category, message, data) = match error {
            Error::Configuration(message) => ("xero.config", message.clone(), BTreeMap::new()),

            Error::UnknownCommand(command) => {
                let mut data = BTreeMap::new();
                data.insert("command".to_string(), Value::from(command.clone()));
                ("xero.validation", "Unknown command".to_string(), data)
            }

            Error::MissingArgument(command) => {
                let mut data = BTreeMap::new();
                data.insert("command".to_string(), Value::from(command.clone()));
                ("xero.validation", "Missing HTTP method".to_string(), data)
            }

            Error::UnsupportedMethod { command, method } => {
                let mut data = BTreeMap::new();
                data.insert("command".to_string(), Value::from(command.clone()));
                data.insert("method".to_string(), Value::from(method.clone()));
                ("xero.validation", "Unsupported method".to_string(), data)
            }

            Error::InvalidPayload(method) => {
                let mut data = BTreeMap::new();
                data.insert("method".to_string(), Value::from(method.clone()));
                ("xero.validation", "Invalid payload".to_string(), data)
            }

            Error::InvalidArgument(message) => {
                ("xero.validation", message.clone(), BTreeMap::new())
            }

            Error::OAuthConfiguration { diagnostics } => {
                let mut data = BTreeMap::new();
                data.insert(
                    "diagnostics".to_string(),
                    Value::from(diagnostics.join("; ")),
                );
                ("auth", "OAuth configuration error".to_string(), data)
            }

            Error::Signing(message) => ("auth", format!("Signing failed: {message}"), BTreeMap::new()),

            Error::Api { status, .. } => {
                let mut data = BTreeMap::new();
                data.insert("status_code".to_string(), Value::from(*status));
                ("xero.api", format!("Xero API error: {status}"), data)
            }

            Error::Session(source) => (
                "xero.session",
                format!("Session store error: {source}"),
                BTreeMap::new(),
            ),

            Error::Request(source) => (
                "http.request",
                format!("HTTP request error: {source}"),
                BTreeMap::new(),
            ),

            Error::Markup(source) => (
                "http.response",
                format!("Failed to decode XML response: {source}"),
                BTreeMap::new(),
            ),

            Error::Deserialization(source, _) => (
                "http.response",
                format!("Failed to decode JSON response: {source}"),
                BTreeMap::new(),
            ),

            Error::InvalidEndpoint => (
                "xero.config",
                "Invalid endpoint URL".to_string(),
                BTreeMap::new(),
            ),
        };

        Breadcrumb {
            ty: "error".to_string(),
            category: Some(category.to_string()),
            message: Some(message),
            data,
            level: sentry_core::Level::Error,
            ..Default::default()
        }
    }
}

/// Convert an xero-command Error into Sentry context data.
///
/// # Example
///
/// ```ignore
/// use sentry::configure_scope;
/// use xero_command::sentry_integration::error_to_sentry_context;
///
/// if let Err(e) = client.invoices().list().await {
///     configure_scope(|scope| {
///         for (key, value) in error_to_sentry_context(&e) {
///             scope.set_extra(&key, value);
///         }
///     });
/// }
/// ```
#[must_use]
pub fn error_to_sentry_context(error: &Error) -> BTreeMap<String, Value> {
    let mut context = BTreeMap::new();

    if let Some(span_trace) = error.span_trace() {
        context.insert(
            "xero.span_trace".to_string(),
            Value::from(format!("{span_trace}")),
        );
    }

    if let Some(status) = error.status_code() {
        context.insert("xero.status_code".to_string(), Value::from(status));
    }

    if let Some(body) = error.response_body() {
        let truncated = match body.char_indices().nth(BODY_PREVIEW_LEN) {
            Some((end, _)) => format!("{}...", &body[..end]),
            None => body.to_string(),
        };
        context.insert("xero.response_body".to_string(), Value::from(truncated));
    }

    context
}
