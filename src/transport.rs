//! `reqwest` transport for [`OAuthTransport`].
//!
//! OAuth 1.0a signatures are produced by a [`RequestSigner`] supplied by the
//! caller; this module only assembles the request around the header it
//! returns.

use std::{collections::BTreeMap, fs::File, sync::Arc};

use reqwest::header;
use url::Url;

use crate::{
    config::ResponseFormat,
    endpoints::{ApiSet, BASE_URL, HttpMethod},
    error::{Error, Result},
    oauth::{ApplicationType, OAuthConfig, OAuthTransport, TransportResponse},
    request::IF_MODIFIED_SINCE,
};

/// Form field carrying the XML body of `PUT`/`POST` requests.
pub const BODY_FIELD: &str = "xml";

/// The parts of a request that take part in an OAuth 1.0a signature.
#[derive(Debug)]
pub struct SigningRequest<'a> {
    pub method: HttpMethod,
    /// Target URL, including query filters.
    pub url: &'a Url,
    /// Form-encoded body parameters.
    pub body_params: &'a [(String, String)],
    pub config: &'a OAuthConfig,
}

/// Produces the `Authorization` header value for a request.
pub trait RequestSigner: Send + Sync {
    fn authorization(&self, request: &SigningRequest<'_>) -> std::result::Result<String, String>;
}

impl<F> RequestSigner for F
where
    F: Fn(&SigningRequest<'_>) -> std::result::Result<String, String> + Send + Sync,
{
    fn authorization(&self, request: &SigningRequest<'_>) -> std::result::Result<String, String> {
        self(request)
    }
}

/// Sends signed requests with `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: Url,
    signer: Option<Arc<dyn RequestSigner>>,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url.as_str())
            .field("signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// A transport against `https://api.xero.com/` without a signer.
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(BASE_URL).map_err(|_| Error::InvalidEndpoint)?,
            signer: None,
        })
    }

    #[must_use]
    pub fn with_signer(mut self, signer: impl RequestSigner + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Points the transport at another host, e.g. a local mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn negotiated_format(headers: &header::HeaderMap, requested: ResponseFormat) -> ResponseFormat {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if content_type.contains("json") {
            ResponseFormat::Json
        } else if content_type.contains("pdf") {
            ResponseFormat::Pdf
        } else if content_type.contains("xml") {
            ResponseFormat::Xml
        } else {
            requested
        }
    }
}

fn check_readable(label: &str, path: &std::path::Path, problems: &mut Vec<String>) {
    if let Err(e) = File::open(path) {
        problems.push(format!("{label} {} cannot be read: {e}", path.display()));
    }
}

impl OAuthTransport for ReqwestTransport {
    fn diagnostics(&self, config: &OAuthConfig) -> Vec<String> {
        let mut problems = Vec::new();
        if config.consumer_key.is_empty() {
            problems.push("consumer key is not set".to_string());
        }
        if config.shared_secret.is_empty() {
            problems.push("shared secret is not set".to_string());
        }
        if config.application_type == ApplicationType::Private {
            check_readable("RSA private key", &config.rsa_private_key, &mut problems);
            check_readable("RSA public key", &config.rsa_public_key, &mut problems);
        }
        if config.core_version.is_empty() {
            problems.push("core API version is not set".to_string());
        }
        if self.signer.is_none() {
            problems.push("no request signer is configured".to_string());
        }
        problems
    }

    fn url(&self, segments: &[&str], api_set: ApiSet) -> Result<Url> {
        api_set.url(&self.base_url, segments)
    }

    #[instrument(skip(self, config, filters, body))]
    async fn request(
        &self,
        config: &OAuthConfig,
        method: HttpMethod,
        url: Url,
        filters: &BTreeMap<String, String>,
        body: Option<&str>,
        format: ResponseFormat,
    ) -> Result<TransportResponse> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| Error::Signing("no request signer is configured".to_string()))?;

        let mut url = url;
        let modified_since = filters.get(IF_MODIFIED_SINCE);
        let query: Vec<_> = filters
            .iter()
            .filter(|(key, _)| key.as_str() != IF_MODIFIED_SINCE)
            .collect();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let form: Vec<(String, String)> = body
            .map(|body| vec![(BODY_FIELD.to_string(), body.to_string())])
            .unwrap_or_default();
        let authorization = signer
            .authorization(&SigningRequest {
                method,
                url: &url,
                body_params: &form,
                config,
            })
            .map_err(Error::Signing)?;

        let mut request = self
            .http
            .request(method.into(), url)
            .header(header::ACCEPT, format.mime_type())
            .header(header::USER_AGENT, config.user_agent.as_str())
            .header(header::AUTHORIZATION, authorization);
        if let Some(since) = modified_since {
            request = request.header(header::IF_MODIFIED_SINCE, since.as_str());
        }
        if !form.is_empty() {
            request = request.form(&form);
        }

        trace!(?filters, "sending request");
        let response = request.send().await?;
        let status = response.status().as_u16();
        let format = Self::negotiated_format(response.headers(), format);
        let body = response.bytes().await?.to_vec();
        debug!(status, %format, bytes = body.len(), "received response");

        Ok(TransportResponse {
            status,
            body,
            format,
        })
    }
}
