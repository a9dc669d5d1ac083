//! Credential validation and the configuration inputs of a [`Client`](crate::Client).

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::error::{Error, Result};

const MISSING_CREDENTIALS: &str =
    "A valid consumer key, shared secret and public / private key pair must be provided";
const MISSING_KEY_FILES: &str = "A valid public / private key pair must be provided";

/// Format requested from the API for response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Xml,
    Json,
    /// Opaque binary, never parsed.
    Pdf,
}

impl ResponseFormat {
    /// Parses a format name, falling back to [`ResponseFormat::Xml`] for
    /// anything that is not `xml`, `json` or `pdf`.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|()| {
            warn!(format = value, "unsupported response format, using xml");
            Self::Xml
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }

    /// The `Accept` header value for this format.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Xml => "application/xml",
            Self::Json => "application/json",
            Self::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            "pdf" => Ok(Self::Pdf),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps `@name` path prefixes to directories.
///
/// `@app/config/certs/key.pem` resolves to `<dir>/config/certs/key.pem` when
/// `app` is registered as `<dir>`. Paths with an unregistered alias, or with
/// no alias at all, are returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct PathAliases(HashMap<String, PathBuf>);

impl PathAliases {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `@name` (the leading `@` is optional) as `dir`.
    #[must_use]
    pub fn with(mut self, name: &str, dir: impl Into<PathBuf>) -> Self {
        self.insert(name, dir);
        self
    }

    pub fn insert(&mut self, name: &str, dir: impl Into<PathBuf>) {
        self.0
            .insert(name.trim_start_matches('@').to_string(), dir.into());
    }

    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        let Some(aliased) = path.strip_prefix('@') else {
            return PathBuf::from(path);
        };
        let (name, rest) = aliased
            .split_once(['/', '\\'])
            .unwrap_or((aliased, ""));
        match self.0.get(name) {
            Some(dir) if rest.is_empty() => dir.clone(),
            Some(dir) => dir.join(rest),
            None => PathBuf::from(path),
        }
    }
}

/// Values used for credential inputs the caller leaves out.
#[derive(Debug, Clone)]
pub struct CredentialDefaults {
    pub consumer_key: Option<String>,
    pub shared_secret: Option<String>,
    pub rsa_public_key: String,
    pub rsa_private_key: String,
}

impl Default for CredentialDefaults {
    fn default() -> Self {
        Self {
            consumer_key: None,
            shared_secret: None,
            rsa_public_key: "@app/config/certs/xero_publickey.cer".to_string(),
            rsa_private_key: "@app/config/certs/xero_privatekey.pem".to_string(),
        }
    }
}

/// Credential inputs before validation. Empty strings count as omitted.
#[derive(Debug, Clone, Default)]
pub struct CredentialInputs {
    pub consumer_key: Option<String>,
    pub shared_secret: Option<String>,
    pub rsa_public_key: Option<String>,
    pub rsa_private_key: Option<String>,
    pub format: Option<String>,
}

/// Validated OAuth 1.0a private application credentials.
///
/// Constructed only through validation; the fields cannot change afterwards.
#[derive(Clone)]
pub struct Credentials {
    consumer_key: String,
    shared_secret: String,
    rsa_public_key: PathBuf,
    rsa_private_key: PathBuf,
    response_format: ResponseFormat,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("shared_secret", &"[redacted]")
            .field("rsa_public_key", &self.rsa_public_key)
            .field("rsa_private_key", &self.rsa_private_key)
            .field("response_format", &self.response_format)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl Credentials {
    /// Validates credentials without defaults or path aliases.
    pub fn new(
        consumer_key: impl Into<String>,
        shared_secret: impl Into<String>,
        rsa_public_key: impl Into<String>,
        rsa_private_key: impl Into<String>,
        format: &str,
    ) -> Result<Self> {
        Self::validate(
            CredentialInputs {
                consumer_key: Some(consumer_key.into()),
                shared_secret: Some(shared_secret.into()),
                rsa_public_key: Some(rsa_public_key.into()),
                rsa_private_key: Some(rsa_private_key.into()),
                format: Some(format.to_string()),
            },
            &CredentialDefaults {
                rsa_public_key: String::new(),
                rsa_private_key: String::new(),
                ..CredentialDefaults::default()
            },
            &PathAliases::default(),
        )
    }

    /// Validates credentials read from `XERO_CONSUMER_KEY`, `XERO_SHARED_SECRET`,
    /// `XERO_RSA_PUBLIC_KEY`, `XERO_RSA_PRIVATE_KEY` and `XERO_RESPONSE_FORMAT`.
    ///
    /// Unset key paths fall back to the default aliased paths.
    pub fn from_env(aliases: &PathAliases) -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok();
        Self::validate(
            CredentialInputs {
                consumer_key: var("XERO_CONSUMER_KEY"),
                shared_secret: var("XERO_SHARED_SECRET"),
                rsa_public_key: var("XERO_RSA_PUBLIC_KEY"),
                rsa_private_key: var("XERO_RSA_PRIVATE_KEY"),
                format: var("XERO_RESPONSE_FORMAT"),
            },
            &CredentialDefaults::default(),
            aliases,
        )
    }

    /// Fills omitted inputs from `defaults`, resolves key paths through
    /// `aliases` and checks that all four values are present and both key
    /// files exist. An unknown format silently becomes `xml`.
    #[instrument(skip(inputs, defaults), fields(consumer_key = ?inputs.consumer_key))]
    pub fn validate(
        inputs: CredentialInputs,
        defaults: &CredentialDefaults,
        aliases: &PathAliases,
    ) -> Result<Self> {
        let consumer_key =
            non_empty(inputs.consumer_key).or_else(|| non_empty(defaults.consumer_key.clone()));
        let shared_secret =
            non_empty(inputs.shared_secret).or_else(|| non_empty(defaults.shared_secret.clone()));
        let rsa_public_key = non_empty(inputs.rsa_public_key)
            .or_else(|| non_empty(Some(defaults.rsa_public_key.clone())));
        let rsa_private_key = non_empty(inputs.rsa_private_key)
            .or_else(|| non_empty(Some(defaults.rsa_private_key.clone())));

        let (Some(consumer_key), Some(shared_secret), Some(rsa_public_key), Some(rsa_private_key)) =
            (consumer_key, shared_secret, rsa_public_key, rsa_private_key)
        else {
            return Err(Error::Configuration(MISSING_CREDENTIALS.to_string()));
        };

        let rsa_public_key = aliases.resolve(&rsa_public_key);
        let rsa_private_key = aliases.resolve(&rsa_private_key);
        if !rsa_public_key.is_file() || !rsa_private_key.is_file() {
            debug!(
                public = %rsa_public_key.display(),
                private = %rsa_private_key.display(),
                "key pair not found"
            );
            return Err(Error::Configuration(MISSING_KEY_FILES.to_string()));
        }

        let response_format = non_empty(inputs.format)
            .map(|f| ResponseFormat::parse_lenient(&f))
            .unwrap_or_default();

        Ok(Self {
            consumer_key,
            shared_secret,
            rsa_public_key,
            rsa_private_key,
            response_format,
        })
    }

    #[must_use]
    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    #[must_use]
    pub fn shared_secret(&self) -> &str {
        &self.shared_secret
    }

    #[must_use]
    pub fn rsa_public_key(&self) -> &Path {
        &self.rsa_public_key
    }

    #[must_use]
    pub fn rsa_private_key(&self) -> &Path {
        &self.rsa_private_key
    }

    #[must_use]
    pub fn response_format(&self) -> ResponseFormat {
        self.response_format
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn key_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config/certs")).unwrap();
        fs::write(dir.path().join("config/certs/xero_publickey.cer"), "cer").unwrap();
        fs::write(dir.path().join("config/certs/xero_privatekey.pem"), "pem").unwrap();
        dir
    }

    #[test]
    fn aliases_replace_known_prefixes_only() {
        let aliases = PathAliases::new().with("@app", "/srv/app");
        assert_eq!(aliases.resolve("@app/certs/a.pem"), PathBuf::from("/srv/app/certs/a.pem"));
        assert_eq!(aliases.resolve("@app"), PathBuf::from("/srv/app"));
        assert_eq!(aliases.resolve("@runtime/x"), PathBuf::from("@runtime/x"));
        assert_eq!(aliases.resolve("plain/x"), PathBuf::from("plain/x"));
    }

    #[test]
    fn defaults_fill_omitted_key_paths() {
        let dir = key_dir();
        let aliases = PathAliases::new().with("app", dir.path());
        let credentials = Credentials::validate(
            CredentialInputs {
                consumer_key: Some("key".into()),
                shared_secret: Some("secret".into()),
                format: Some("json".into()),
                ..CredentialInputs::default()
            },
            &CredentialDefaults::default(),
            &aliases,
        )
        .unwrap();

        assert_eq!(credentials.response_format(), ResponseFormat::Json);
        assert_eq!(
            credentials.rsa_private_key(),
            dir.path().join("config/certs/xero_privatekey.pem")
        );
    }

    #[test]
    fn empty_field_is_a_configuration_error() {
        let dir = key_dir();
        let public = dir.path().join("config/certs/xero_publickey.cer");
        let private = dir.path().join("config/certs/xero_privatekey.pem");
        let result = Credentials::new(
            "",
            "secret",
            public.to_string_lossy(),
            private.to_string_lossy(),
            "xml",
        );
        assert!(matches!(result, Err(Error::Configuration(m)) if m == MISSING_CREDENTIALS));
    }

    #[test]
    fn missing_key_file_is_a_configuration_error() {
        let dir = key_dir();
        let public = dir.path().join("config/certs/xero_publickey.cer");
        let result = Credentials::new(
            "key",
            "secret",
            public.to_string_lossy(),
            dir.path().join("nope.pem").to_string_lossy(),
            "xml",
        );
        assert!(matches!(result, Err(Error::Configuration(m)) if m == MISSING_KEY_FILES));
    }

    #[test]
    fn unknown_format_falls_back_to_xml() {
        assert_eq!(ResponseFormat::parse_lenient("yaml"), ResponseFormat::Xml);
        assert_eq!(ResponseFormat::parse_lenient("pdf"), ResponseFormat::Pdf);
    }
}
