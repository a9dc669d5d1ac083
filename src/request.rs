//! Typed requests per HTTP method and the positional argument form accepted
//! by [`Client::invoke`](crate::Client::invoke).

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::{
    endpoints::{Command, HttpMethod, ResourceDescriptor},
    error::{Error, Result},
    utils::{date_format, markup, sanitize::strip_tags},
};

/// Filter key carrying the "modified since" timestamp.
pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";

/// A fully assembled request, ready for signing and transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    /// Resource slug, e.g. `Invoices`.
    pub resource: &'static str,
    /// Object id addressed within the collection.
    pub id: Option<String>,
    pub filters: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl RequestSpec {
    /// URL path segments below the API set: the slug, then the id if any.
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        std::iter::once(self.resource)
            .chain(self.id.as_deref())
            .collect()
    }

    /// `{slug}` or `{slug}/{id}`, for logs.
    #[must_use]
    pub fn path(&self) -> String {
        self.segments().join("/")
    }
}

/// Sanitizes an object id. A blank id addresses the whole collection; `.`
/// and `..` would address another resource and are rejected.
fn object_id(id: Option<String>) -> Result<Option<String>> {
    let Some(id) = id.map(|id| strip_tags(&id)).filter(|id| !id.is_empty()) else {
        return Ok(None);
    };
    let decoded = id.to_ascii_lowercase().replace("%2e", ".");
    if decoded == "." || decoded == ".." {
        return Err(Error::InvalidArgument(format!("{id:?} is not a valid object id")));
    }
    Ok(Some(id))
}

/// Parameters of a `GET` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetRequest {
    /// Target a single object. Filters and `modified_since` are ignored when set.
    pub id: Option<String>,
    pub modified_since: Option<PrimitiveDateTime>,
    /// Additional query filters such as `where` and `order`.
    pub filters: BTreeMap<String, String>,
}

impl GetRequest {
    /// Lists the whole collection.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn modified_since(mut self, since: PrimitiveDateTime) -> Self {
        self.modified_since = Some(since);
        self
    }

    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Adds a `where` filter, e.g. `Status=="AUTHORISED"`.
    #[must_use]
    pub fn where_clause(self, clause: impl Into<String>) -> Self {
        self.filter("where", clause)
    }

    #[must_use]
    pub fn order(self, order: impl Into<String>) -> Self {
        self.filter("order", order)
    }

    pub(crate) fn into_spec(self, descriptor: &ResourceDescriptor) -> Result<RequestSpec> {
        if let Some(id) = object_id(self.id)? {
            return Ok(RequestSpec {
                method: HttpMethod::Get,
                resource: descriptor.slug,
                id: Some(id),
                filters: BTreeMap::new(),
                body: None,
            });
        }

        let mut filters = self.filters;
        if let Some(since) = self.modified_since {
            let since = date_format::format_modified_since(since).map_err(Error::InvalidArgument)?;
            filters.insert(IF_MODIFIED_SINCE.to_string(), since);
        }
        Ok(RequestSpec {
            method: HttpMethod::Get,
            resource: descriptor.slug,
            id: None,
            filters,
            body: None,
        })
    }
}

/// The body of a `PUT` or `POST` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Field mapping serialized under the resource slug as root element.
    Fields(Map<String, Value>),
    /// A pre-built XML document.
    Markup(String),
}

impl Payload {
    /// The XML body sent to the API, without its declaration.
    pub fn to_body(&self, slug: &str) -> Result<String> {
        match self {
            Self::Fields(fields) => {
                markup::fields_to_xml(slug, fields).map(|xml| markup::strip_declaration(&xml))
            }
            Self::Markup(document) => Ok(markup::strip_declaration(document)),
        }
    }
}

/// Parameters of a `PUT` (create) or `POST` (update) call.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub payload: Payload,
}

impl WriteRequest {
    #[must_use]
    pub fn fields(fields: Map<String, Value>) -> Self {
        Self {
            payload: Payload::Fields(fields),
        }
    }

    #[must_use]
    pub fn markup(document: impl Into<String>) -> Self {
        Self {
            payload: Payload::Markup(document.into()),
        }
    }

    pub(crate) fn into_spec(
        self,
        method: HttpMethod,
        descriptor: &ResourceDescriptor,
    ) -> Result<RequestSpec> {
        Ok(RequestSpec {
            method,
            resource: descriptor.slug,
            id: None,
            filters: BTreeMap::new(),
            body: Some(self.payload.to_body(descriptor.slug)?),
        })
    }
}

/// Parameters of a `DELETE` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteRequest {
    pub id: Option<String>,
}

impl DeleteRequest {
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }

    pub(crate) fn into_spec(self, descriptor: &ResourceDescriptor) -> Result<RequestSpec> {
        Ok(RequestSpec {
            method: HttpMethod::Delete,
            resource: descriptor.slug,
            id: object_id(self.id)?,
            filters: BTreeMap::new(),
            body: None,
        })
    }
}

/// A positional argument of [`Client::invoke`](crate::Client::invoke).
///
/// The first argument is always the HTTP method. For `GET` the rest are the
/// object id, a modified-since timestamp and a filter mapping, any of which
/// may be [`Argument::Empty`]; with an id the last two are ignored.
/// `PUT`/`POST` take exactly one [`Argument::Fields`] or [`Argument::Markup`]
/// payload. `DELETE` takes an optional id.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A skipped positional slot.
    Empty,
    Text(String),
    Timestamp(PrimitiveDateTime),
    Filters(BTreeMap<String, String>),
    Fields(Map<String, Value>),
    Markup(String),
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<HttpMethod> for Argument {
    fn from(value: HttpMethod) -> Self {
        Self::Text(value.as_str().to_string())
    }
}

impl From<PrimitiveDateTime> for Argument {
    fn from(value: PrimitiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl From<OffsetDateTime> for Argument {
    fn from(value: OffsetDateTime) -> Self {
        let utc = value.to_offset(UtcOffset::UTC);
        Self::Timestamp(PrimitiveDateTime::new(utc.date(), utc.time()))
    }
}

impl From<BTreeMap<String, String>> for Argument {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Filters(value)
    }
}

impl From<Map<String, Value>> for Argument {
    fn from(value: Map<String, Value>) -> Self {
        Self::Fields(value)
    }
}

impl<T: Into<Argument>> From<Option<T>> for Argument {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

impl From<WriteRequest> for Argument {
    fn from(value: WriteRequest) -> Self {
        match value.payload {
            Payload::Fields(fields) => Self::Fields(fields),
            Payload::Markup(document) => Self::Markup(document),
        }
    }
}

impl Argument {
    /// A pre-built XML document payload. Plain text is never taken as one.
    #[must_use]
    pub fn markup(document: impl Into<String>) -> Self {
        Self::Markup(document.into())
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Empty => "nothing",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "a timestamp",
            Self::Filters(_) => "filters",
            Self::Fields(_) => "fields",
            Self::Markup(_) => "markup",
        }
    }

    fn into_id(self, position: &str) -> Result<Option<String>> {
        match self {
            Self::Empty => Ok(None),
            Self::Text(id) => Ok(Some(id)),
            other => Err(Error::InvalidArgument(format!(
                "expected an object id as {position}, got {}",
                other.describe()
            ))),
        }
    }
}

/// A request decoded from positional arguments, one variant per method.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Get(GetRequest),
    Write(HttpMethod, WriteRequest),
    Delete(DeleteRequest),
}

impl Invocation {
    /// Interprets `args` for `command`: validates the method against the
    /// resource table and decodes the method-specific arguments.
    pub fn from_arguments(command: Command, args: Vec<Argument>) -> Result<Self> {
        let mut args = args.into_iter();
        let method = match args.next() {
            None => return Err(Error::MissingArgument(command.name().to_string())),
            Some(Argument::Text(method)) => strip_tags(&method),
            Some(other) => {
                return Err(Error::UnsupportedMethod {
                    command: command.name().to_string(),
                    method: other.describe().to_string(),
                });
            }
        };
        let method = method
            .parse::<HttpMethod>()
            .ok()
            .filter(|m| command.descriptor().supports(*m))
            .ok_or_else(|| Error::UnsupportedMethod {
                command: command.name().to_string(),
                method: method.clone(),
            })?;

        match method {
            HttpMethod::Get => {
                let id = args.next().map_or(Ok(None), |a| a.into_id("the second argument"))?;
                if let Some(id) = object_id(id)? {
                    return Ok(Self::Get(GetRequest::by_id(id)));
                }
                let modified_since = match args.next() {
                    None | Some(Argument::Empty) => None,
                    Some(Argument::Timestamp(since)) => Some(since),
                    Some(Argument::Text(since)) => Some(
                        date_format::parse_timestamp(&since).map_err(Error::InvalidArgument)?,
                    ),
                    Some(other) => {
                        return Err(Error::InvalidArgument(format!(
                            "expected a modified-since timestamp as the third argument, got {}",
                            other.describe()
                        )));
                    }
                };
                let filters = match args.next() {
                    None | Some(Argument::Empty) => BTreeMap::new(),
                    Some(Argument::Filters(filters)) => filters,
                    Some(other) => {
                        return Err(Error::InvalidArgument(format!(
                            "expected filters as the fourth argument, got {}",
                            other.describe()
                        )));
                    }
                };
                Ok(Self::Get(GetRequest {
                    id: None,
                    modified_since,
                    filters,
                }))
            }
            HttpMethod::Post | HttpMethod::Put => {
                let payload = match (args.next(), args.next()) {
                    (Some(Argument::Fields(fields)), None) => Payload::Fields(fields),
                    (Some(Argument::Markup(document)), None) => Payload::Markup(document),
                    _ => return Err(Error::InvalidPayload(method.to_string())),
                };
                Ok(Self::Write(method, WriteRequest { payload }))
            }
            HttpMethod::Delete => {
                let id = args.next().map_or(Ok(None), |a| a.into_id("the second argument"))?;
                Ok(Self::Delete(DeleteRequest { id }))
            }
        }
    }

    #[must_use]
    pub fn method(&self) -> HttpMethod {
        match self {
            Self::Get(_) => HttpMethod::Get,
            Self::Write(method, _) => *method,
            Self::Delete(_) => HttpMethod::Delete,
        }
    }

    /// Builds the request for `command`'s resource.
    pub fn into_spec(self, command: Command) -> Result<RequestSpec> {
        let descriptor = command.descriptor();
        match self {
            Self::Get(request) => request.into_spec(&descriptor),
            Self::Write(method, request) => request.into_spec(method, &descriptor),
            Self::Delete(request) => request.into_spec(&descriptor),
        }
    }
}
