use miette::Diagnostic;
use thiserror::Error;
use tracing_error::SpanTrace;

use crate::session::SessionError;

/// Errors that can occur when dispatching commands against the Xero API.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// Missing or invalid credentials, or key files that cannot be found.
    #[error("{0}")]
    #[diagnostic(
        code(xero_command::configuration),
        help("Provide a consumer key, shared secret and paths to an existing RSA key pair")
    )]
    Configuration(String),

    #[error("the command \"{0}\" is not valid for the Xero API")]
    #[diagnostic(
        code(xero_command::unknown_command),
        help("See `Command` for the list of supported resource commands")
    )]
    UnknownCommand(String),

    #[error("at least one argument must be supplied with the HTTP method when calling \"{0}\"")]
    #[diagnostic(code(xero_command::missing_argument))]
    MissingArgument(String),

    #[error("the Xero API command \"{command}\" does not support the method \"{method}\"")]
    #[diagnostic(
        code(xero_command::unsupported_method),
        help("Check the allowed methods of the resource descriptor")
    )]
    UnsupportedMethod { command: String, method: String },

    #[error("two parameters are required for method \"{0}\", the method and the XML data")]
    #[diagnostic(
        code(xero_command::invalid_payload),
        help("Pass either a field mapping or a pre-built XML document as the payload")
    )]
    InvalidPayload(String),

    /// An argument had the right position but could not be interpreted.
    #[error("invalid argument: {0}")]
    #[diagnostic(code(xero_command::invalid_argument))]
    InvalidArgument(String),

    /// The transport reported configuration problems before any request was made.
    #[error("the Xero OAuth call has returned the following errors:\n{}", format_diagnostics(.diagnostics))]
    #[diagnostic(
        code(xero_command::oauth_configuration),
        help("Verify the consumer key, key files and request signer")
    )]
    OAuthConfiguration { diagnostics: Vec<String> },

    /// The request signer could not produce an `Authorization` header.
    #[error("failed to sign request: {0}")]
    #[diagnostic(
        code(xero_command::signing),
        help("Check the RSA private key and the configured request signer")
    )]
    Signing(String),

    /// A non-200 response returned by the API.
    #[error("the Xero API has returned status {status}:\n{raw_body}")]
    #[diagnostic(
        code(xero_command::api_error),
        help("Review the error document returned by the Xero API")
    )]
    Api {
        status: u16,
        raw_body: String,
        span_trace: SpanTrace,
    },

    #[error("session store error: {0}")]
    #[diagnostic(code(xero_command::session))]
    Session(#[from] SessionError),

    #[error("error making request: {0:?}")]
    #[diagnostic(
        code(xero_command::request_error),
        help("Check your network connection and Xero API availability")
    )]
    Request(#[source] reqwest::Error),

    #[error("error reading XML: {0}")]
    #[diagnostic(
        code(xero_command::markup_error),
        help("The API returned XML that could not be decoded")
    )]
    Markup(#[source] quick_xml::Error),

    #[error("error decoding response: {0:?}")]
    #[diagnostic(
        code(xero_command::deserialization_error),
        help("The API returned data in an unexpected format")
    )]
    Deserialization(#[source] serde_json::Error, Option<String>),

    #[error("endpoint could not be parsed as a URL")]
    #[diagnostic(
        code(xero_command::invalid_endpoint),
        help("Check that the API endpoint URL is correctly formatted")
    )]
    InvalidEndpoint,
}

fn format_diagnostics(diagnostics: &[String]) -> String {
    diagnostics
        .iter()
        .map(|d| format!(" - {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    pub(crate) fn api(status: u16, raw_body: String) -> Self {
        Self::Api {
            status,
            raw_body,
            span_trace: SpanTrace::capture(),
        }
    }

    /// The HTTP status of an API error, if this is one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The raw body returned with an API error.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Api { raw_body, .. } => Some(raw_body),
            Self::Deserialization(_, body) => body.as_deref(),
            _ => None,
        }
    }

    /// The span trace captured when an API error was created.
    #[must_use]
    pub fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            Self::Api { span_trace, .. } => Some(span_trace),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Deserialization(e, None)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Self::Markup(e)
    }
}

/// Type alias for results from this crate.
///
/// This is already a Miette diagnostic result due to the implementation of
/// the Diagnostic trait for the Error type.
pub type Result<O> = std::result::Result<O, Error>;
