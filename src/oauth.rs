use std::{collections::BTreeMap, fmt, future::Future, path::PathBuf};

use url::Url;

use crate::{
    config::{Credentials, ResponseFormat},
    endpoints::{ApiSet, HttpMethod},
    error::{Error, Result},
    session::OAuthSession,
    utils::markup,
};

/// API version tag handed to the transport for the core API set.
pub const CORE_VERSION: &str = "2.0";

/// Callback used by applications that never redirect ("out of band").
pub const OUT_OF_BAND: &str = "oob";

/// The kind of Xero OAuth 1.0a application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplicationType {
    /// Two-legged RSA-SHA1 application; the consumer key doubles as the token.
    #[default]
    Private,
    Public,
    Partner,
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Private => "Private",
            Self::Public => "Public",
            Self::Partner => "Partner",
        })
    }
}

/// Everything the signing transport needs for one call.
#[derive(Clone)]
pub struct OAuthConfig {
    pub consumer_key: String,
    pub shared_secret: String,
    pub rsa_public_key: PathBuf,
    pub rsa_private_key: PathBuf,
    pub application_type: ApplicationType,
    pub oauth_callback: String,
    pub user_agent: String,
    pub core_version: String,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
    pub session_handle: Option<String>,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("consumer_key", &self.consumer_key)
            .field("rsa_public_key", &self.rsa_public_key)
            .field("rsa_private_key", &self.rsa_private_key)
            .field("application_type", &self.application_type)
            .field("oauth_callback", &self.oauth_callback)
            .field("user_agent", &self.user_agent)
            .field("core_version", &self.core_version)
            .field("access_token", &self.access_token)
            .field("session_handle", &self.session_handle)
            .finish_non_exhaustive()
    }
}

impl OAuthConfig {
    /// A private-application configuration for `credentials`.
    #[must_use]
    pub fn private(credentials: &Credentials, user_agent: &str) -> Self {
        Self {
            consumer_key: credentials.consumer_key().to_string(),
            shared_secret: credentials.shared_secret().to_string(),
            rsa_public_key: credentials.rsa_public_key().to_path_buf(),
            rsa_private_key: credentials.rsa_private_key().to_path_buf(),
            application_type: ApplicationType::Private,
            oauth_callback: OUT_OF_BAND.to_string(),
            user_agent: user_agent.to_string(),
            core_version: CORE_VERSION.to_string(),
            access_token: None,
            access_token_secret: None,
            session_handle: None,
        }
    }

    /// The token pair this configuration currently signs with. Private
    /// applications use the consumer key and shared secret, with no session
    /// handle.
    #[must_use]
    pub fn request_token(&self) -> OAuthSession {
        OAuthSession::new(&*self.consumer_key, &*self.shared_secret, "")
    }

    /// Signs subsequent requests with `session`'s token.
    pub fn attach_session(&mut self, session: &OAuthSession) {
        self.access_token = Some(session.oauth_token.clone());
        self.access_token_secret = Some(session.oauth_token_secret.clone());
        self.session_handle = Some(session.oauth_session_handle.clone());
    }
}

/// Raw outcome of a transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Format the API actually answered with.
    pub format: ResponseFormat,
}

impl TransportResponse {
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A decoded successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// XML or JSON decoded into a tree.
    Structured(serde_json::Value),
    /// PDF bytes, passed through untouched.
    Binary(Vec<u8>),
}

impl ParsedResponse {
    #[must_use]
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Binary(_) => None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<serde_json::Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Binary(_) => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            Self::Structured(_) => None,
        }
    }
}

/// Signs and sends requests on behalf of a [`Client`](crate::Client).
///
/// OAuth 1.0a signing and HTTP transport live behind this trait. The client
/// only decides what to send and how to interpret the answer.
pub trait OAuthTransport: Send + Sync {
    /// Pre-flight checks of `config`; each entry describes one problem.
    fn diagnostics(&self, config: &OAuthConfig) -> Vec<String>;

    /// Resolves path `segments` under `api_set`, one URL segment each.
    fn url(&self, segments: &[&str], api_set: ApiSet) -> Result<Url>;

    /// Signs and sends one request.
    fn request(
        &self,
        config: &OAuthConfig,
        method: HttpMethod,
        url: Url,
        filters: &BTreeMap<String, String>,
        body: Option<&str>,
        format: ResponseFormat,
    ) -> impl Future<Output = Result<TransportResponse>> + Send;

    /// Decodes a successful response body.
    fn parse_response(&self, body: &[u8], format: ResponseFormat) -> Result<ParsedResponse> {
        match format {
            ResponseFormat::Xml => markup::xml_to_value(body).map(ParsedResponse::Structured),
            ResponseFormat::Json => serde_json::from_slice(body)
                .map(ParsedResponse::Structured)
                .map_err(|e| {
                    Error::Deserialization(e, Some(String::from_utf8_lossy(body).into_owned()))
                }),
            ResponseFormat::Pdf => Ok(ParsedResponse::Binary(body.to_vec())),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct NoTransport;

    impl OAuthTransport for NoTransport {
        fn diagnostics(&self, _config: &OAuthConfig) -> Vec<String> {
            Vec::new()
        }

        fn url(&self, _segments: &[&str], _api_set: ApiSet) -> Result<Url> {
            Err(Error::InvalidEndpoint)
        }

        async fn request(
            &self,
            _config: &OAuthConfig,
            _method: HttpMethod,
            _url: Url,
            _filters: &BTreeMap<String, String>,
            _body: Option<&str>,
            _format: ResponseFormat,
        ) -> Result<TransportResponse> {
            Err(Error::InvalidEndpoint)
        }
    }

    #[test]
    fn default_parser_follows_the_format() {
        let json = NoTransport
            .parse_response(br#"{"Invoices":[]}"#, ResponseFormat::Json)
            .unwrap();
        assert_eq!(json.as_value(), Some(&json!({ "Invoices": [] })));

        let xml = NoTransport
            .parse_response(b"<Response><Status>OK</Status></Response>", ResponseFormat::Xml)
            .unwrap();
        assert_eq!(xml.into_value(), Some(json!({ "Status": "OK" })));

        let pdf = NoTransport
            .parse_response(b"%PDF-1.4", ResponseFormat::Pdf)
            .unwrap();
        assert_eq!(pdf.as_bytes(), Some(&b"%PDF-1.4"[..]));
    }

    #[test]
    fn malformed_json_keeps_the_body() {
        let error = NoTransport
            .parse_response(b"not json", ResponseFormat::Json)
            .unwrap_err();
        assert_eq!(error.response_body(), Some("not json"));
    }
}
