use std::{path::PathBuf, str::FromStr};

use time::PrimitiveDateTime;

use crate::{
    config::{CredentialDefaults, CredentialInputs, Credentials, PathAliases, ResponseFormat},
    endpoints::{ApiSet, Command, HttpMethod},
    error::{Error, Result},
    oauth::{OAuthConfig, OAuthTransport, ParsedResponse},
    request::{Argument, DeleteRequest, GetRequest, Invocation, RequestSpec, WriteRequest},
    session::{DEFAULT_SESSION_FILE, FileSessionStore, OAuthSession, SessionStore},
};

/// Validation message Xero returns when a contact write matches an archived contact.
pub const ARCHIVED_CONTACT_MESSAGE: &str =
    "The specified contact details matched an archived contact";

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("xero-command/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
/// This is the client used for dispatching commands against the Xero API. It owns the validated
/// credentials, the signing transport and the store the OAuth session is persisted to.
///
/// Every call is a self-contained transaction: validate, persist and reload the session, send
/// once, decode. There is no retry.
pub struct Client<T, S = FileSessionStore> {
    credentials: Credentials,
    transport: T,
    sessions: S,
    user_agent: String,
    /// When set, archived-contact validation errors are reported like any other API error.
    strict_error_mode: bool,
}

impl Client<(), FileSessionStore> {
    /// Starts configuring a client.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }
}

impl<T: OAuthTransport, S: SessionStore> Client<T, S> {
    /// Creates a client from already validated credentials.
    #[must_use]
    pub fn new(credentials: Credentials, transport: T, sessions: S) -> Self {
        Self {
            credentials,
            transport,
            sessions,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            strict_error_mode: false,
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_strict_error_mode(mut self, strict: bool) -> Self {
        self.strict_error_mode = strict;
        self
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub fn format(&self) -> ResponseFormat {
        self.credentials.response_format()
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The session persisted by the last call, if any.
    pub fn session(&self) -> Result<Option<OAuthSession>> {
        Ok(self.sessions.get()?)
    }

    /// Dispatches `command` with positional arguments, the first of which is
    /// the HTTP method. See [`Argument`] for the meaning of the rest.
    ///
    /// Returns `Ok(None)` when no session could be reloaded, and for the
    /// tolerated archived-contact error on `contacts`.
    #[instrument(skip(self, args), fields(args = args.len()))]
    pub async fn invoke(
        &self,
        command: &str,
        args: Vec<Argument>,
    ) -> Result<Option<ParsedResponse>> {
        let command = Command::from_str(command)?;
        let invocation = Invocation::from_arguments(command, args)?;
        self.dispatch(command, invocation).await
    }

    /// Perform a `GET` against `command`'s resource.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        command: Command,
        request: GetRequest,
    ) -> Result<Option<ParsedResponse>> {
        self.dispatch(command, Invocation::Get(request)).await
    }

    /// Perform a `PUT` (create) against `command`'s resource.
    #[instrument(skip(self, request))]
    pub async fn put(
        &self,
        command: Command,
        request: WriteRequest,
    ) -> Result<Option<ParsedResponse>> {
        self.dispatch(command, Invocation::Write(HttpMethod::Put, request))
            .await
    }

    /// Perform a `POST` (update) against `command`'s resource.
    #[instrument(skip(self, request))]
    pub async fn post(
        &self,
        command: Command,
        request: WriteRequest,
    ) -> Result<Option<ParsedResponse>> {
        self.dispatch(command, Invocation::Write(HttpMethod::Post, request))
            .await
    }

    /// Perform a `DELETE` against `command`'s resource.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        command: Command,
        request: DeleteRequest,
    ) -> Result<Option<ParsedResponse>> {
        self.dispatch(command, Invocation::Delete(request)).await
    }

    /// A handle bound to a single resource collection.
    #[must_use]
    pub fn resource(&self, command: Command) -> ResourceApi<'_, T, S> {
        ResourceApi {
            client: self,
            command,
        }
    }

    async fn dispatch(
        &self,
        command: Command,
        invocation: Invocation,
    ) -> Result<Option<ParsedResponse>> {
        let method = invocation.method();
        if !command.descriptor().supports(method) {
            return Err(Error::UnsupportedMethod {
                command: command.name().to_string(),
                method: method.to_string(),
            });
        }
        let spec = invocation.into_spec(command)?;
        self.execute(command, spec).await
    }

    async fn execute(&self, command: Command, spec: RequestSpec) -> Result<Option<ParsedResponse>> {
        let mut config = OAuthConfig::private(&self.credentials, &self.user_agent);

        let diagnostics = self.transport.diagnostics(&config);
        if !diagnostics.is_empty() {
            return Err(Error::OAuthConfiguration { diagnostics });
        }

        self.sessions.put(&config.request_token())?;
        let Some(session) = self.sessions.get()?.filter(OAuthSession::has_token) else {
            debug!("no OAuth session available, skipping request");
            return Ok(None);
        };
        config.attach_session(&session);

        let url = self.transport.url(&spec.segments(), ApiSet::Core)?;
        trace!(method = %spec.method, %url, filters = ?spec.filters, "dispatching command");
        let response = self
            .transport
            .request(
                &config,
                spec.method,
                url,
                &spec.filters,
                spec.body.as_deref(),
                self.format(),
            )
            .await?;

        if response.status == 200 {
            return self
                .transport
                .parse_response(&response.body, response.format)
                .map(Some);
        }

        let raw_body = response.body_text();
        if command == Command::Contacts
            && !self.strict_error_mode
            && raw_body.contains(ARCHIVED_CONTACT_MESSAGE)
        {
            warn!(
                status = response.status,
                "ignoring archived contact validation error"
            );
            return Ok(None);
        }

        debug!(status = response.status, "API returned an error");
        Err(Error::api(response.status, raw_body))
    }
}

/// API handle for a single resource collection, e.g. `client.invoices()`.
#[derive(Debug)]
pub struct ResourceApi<'a, T, S> {
    client: &'a Client<T, S>,
    command: Command,
}

impl<T: OAuthTransport, S: SessionStore> ResourceApi<'_, T, S> {
    #[must_use]
    pub fn command(&self) -> Command {
        self.command
    }

    /// Retrieve the whole collection.
    pub async fn list(&self) -> Result<Option<ParsedResponse>> {
        self.find(GetRequest::all()).await
    }

    /// Retrieve objects changed after `since`.
    pub async fn list_modified_since(
        &self,
        since: PrimitiveDateTime,
    ) -> Result<Option<ParsedResponse>> {
        self.find(GetRequest::all().modified_since(since)).await
    }

    /// Retrieve objects matching `request`'s filters.
    pub async fn find(&self, request: GetRequest) -> Result<Option<ParsedResponse>> {
        self.client.get(self.command, request).await
    }

    /// Retrieve a single object by id or number.
    pub async fn get(&self, id: impl Into<String>) -> Result<Option<ParsedResponse>> {
        self.client.get(self.command, GetRequest::by_id(id)).await
    }

    /// Create objects (`PUT`).
    pub async fn create(&self, request: WriteRequest) -> Result<Option<ParsedResponse>> {
        self.client.put(self.command, request).await
    }

    /// Update or create objects (`POST`).
    pub async fn update(&self, request: WriteRequest) -> Result<Option<ParsedResponse>> {
        self.client.post(self.command, request).await
    }

    pub async fn delete(&self, id: impl Into<String>) -> Result<Option<ParsedResponse>> {
        self.client
            .delete(self.command, DeleteRequest::by_id(id))
            .await
    }
}

macro_rules! resource_accessors {
    ($($name:ident => $command:ident),+ $(,)?) => {
        impl<T: OAuthTransport, S: SessionStore> Client<T, S> {
            $(
                #[doc = concat!("Access the `", stringify!($command), "` API")]
                #[must_use]
                pub fn $name(&self) -> ResourceApi<'_, T, S> {
                    self.resource(Command::$command)
                }
            )+
        }
    };
}

resource_accessors! {
    attachments => Attachments,
    accounts => Accounts,
    bank_transactions => BankTransactions,
    bank_transfers => BankTransfers,
    branding_themes => BrandingThemes,
    contacts => Contacts,
    contact_groups => ContactGroups,
    credit_notes => CreditNotes,
    currencies => Currencies,
    employees => Employees,
    expense_claims => ExpenseClaims,
    invoices => Invoices,
    invoice_reminders => InvoiceReminders,
    items => Items,
    journals => Journals,
    linked_transactions => LinkedTransactions,
    manual_journals => ManualJournals,
    organisation => Organisation,
    overpayments => Overpayments,
    payments => Payments,
    prepayments => Prepayments,
    purchase_orders => PurchaseOrders,
    receipts => Receipts,
    repeating_invoices => RepeatingInvoices,
    reports => Reports,
    tax_rates => TaxRates,
    tracking_categories => TrackingCategories,
    users => Users,
}

/// Collects credential inputs and client options, validating on build.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    inputs: CredentialInputs,
    defaults: CredentialDefaults,
    aliases: PathAliases,
    user_agent: Option<String>,
    session_file: Option<String>,
    strict_error_mode: bool,
}

impl ClientBuilder {
    #[must_use]
    pub fn consumer_key(mut self, consumer_key: impl Into<String>) -> Self {
        self.inputs.consumer_key = Some(consumer_key.into());
        self
    }

    #[must_use]
    pub fn shared_secret(mut self, shared_secret: impl Into<String>) -> Self {
        self.inputs.shared_secret = Some(shared_secret.into());
        self
    }

    /// Path to the public certificate; may start with an `@alias`.
    #[must_use]
    pub fn rsa_public_key(mut self, path: impl Into<String>) -> Self {
        self.inputs.rsa_public_key = Some(path.into());
        self
    }

    /// Path to the private key; may start with an `@alias`.
    #[must_use]
    pub fn rsa_private_key(mut self, path: impl Into<String>) -> Self {
        self.inputs.rsa_private_key = Some(path.into());
        self
    }

    /// `xml`, `json` or `pdf`; anything else means `xml`.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.inputs.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn defaults(mut self, defaults: CredentialDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn alias(mut self, name: &str, dir: impl Into<PathBuf>) -> Self {
        self.aliases.insert(name, dir);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Location of the session file; may start with an `@alias`.
    #[must_use]
    pub fn session_file(mut self, path: impl Into<String>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn strict_error_mode(mut self, strict: bool) -> Self {
        self.strict_error_mode = strict;
        self
    }

    /// Validates the credentials and builds a client persisting its session
    /// to the configured session file.
    pub fn build<T: OAuthTransport>(self, transport: T) -> Result<Client<T, FileSessionStore>> {
        let path = self
            .aliases
            .resolve(self.session_file.as_deref().unwrap_or(DEFAULT_SESSION_FILE));
        self.build_with_store(transport, FileSessionStore::new(path))
    }

    /// Validates the credentials and builds a client with a custom session store.
    pub fn build_with_store<T: OAuthTransport, S: SessionStore>(
        self,
        transport: T,
        sessions: S,
    ) -> Result<Client<T, S>> {
        let credentials = Credentials::validate(self.inputs, &self.defaults, &self.aliases)?;
        let client = Client::new(credentials, transport, sessions)
            .with_strict_error_mode(self.strict_error_mode);
        Ok(match self.user_agent {
            Some(user_agent) => client.with_user_agent(user_agent),
            None => client,
        })
    }
}
