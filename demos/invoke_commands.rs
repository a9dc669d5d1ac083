#[macro_use]
extern crate tracing;

use std::collections::BTreeMap;

use anyhow::Result;
use xero_command::{
    Argument, Client, Credentials, FileSessionStore, GetRequest, PathAliases, ReqwestTransport,
    SigningRequest,
};

/// Stand-in for an RSA-SHA1 signer; replace with a real OAuth 1.0a implementation.
fn signer(request: &SigningRequest<'_>) -> Result<String, String> {
    let signature = std::env::var("XERO_OAUTH_SIGNATURE")
        .map_err(|_| "XERO_OAUTH_SIGNATURE is not set".to_string())?;
    Ok(format!(
        "OAuth oauth_consumer_key=\"{}\", oauth_token=\"{}\", \
         oauth_signature_method=\"RSA-SHA1\", oauth_signature=\"{signature}\"",
        request.config.consumer_key,
        request.config.access_token.as_deref().unwrap_or_default(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // Key paths default to `@app/config/certs/...`
    let app_dir = std::env::current_dir()?;
    let aliases = PathAliases::new().with("app", &app_dir);
    let credentials = Credentials::from_env(&aliases)?;

    let transport = ReqwestTransport::new()?.with_signer(signer);
    let sessions = FileSessionStore::new(app_dir.join("runtime/cache/oauth_session"));
    let client = Client::new(credentials, transport, sessions);

    // Positional form
    let filters = BTreeMap::from([("order".to_string(), "Date DESC".to_string())]);
    let invoices = client
        .invoke(
            "Invoices",
            vec![
                "GET".into(),
                Argument::Empty,
                "2024-01-01 00:00:00".into(),
                filters.into(),
            ],
        )
        .await?;
    info!("invoices: {:#?}", invoices);

    // Typed form
    let customers = client
        .contacts()
        .find(GetRequest::all().where_clause("IsCustomer==true"))
        .await?;
    info!("customers: {:#?}", customers);

    Ok(())
}
