use crate::adapters::parameters::ParameterStore;
use crate::config::{CredentialSourceKind, ForgeConfig};
use crate::domain::credentials::ClientCredentials;
use crate::error::{AppError, Result};

/// Resolves the Forge client credentials once, at startup.
///
/// With `CredentialSourceKind::Env` the configured values are used as-is.
/// With `CredentialSourceKind::Ssm` they name parameters fetched from
/// `parameters`.
///
/// # Errors
/// Returns `AppError::Config` if a value is missing or empty, or if a
/// parameter lookup fails.
#[tracing::instrument(err, skip_all, fields(source = ?config.credential_source))]
pub async fn resolve_client_credentials(
    config: &ForgeConfig,
    parameters: Option<&dyn ParameterStore>,
) -> Result<ClientCredentials> {
    let client_id = required(config.client_id.as_deref(), "FORGE_CLIENT_ID")?;
    let client_secret = required(config.client_secret.as_deref(), "FORGE_CLIENT_SECRET")?;
    let callback_url = required(config.callback_url.as_deref(), "FORGE_CALLBACK_URL")?;

    let credentials = match config.credential_source {
        CredentialSourceKind::Env => ClientCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            callback_url: callback_url.to_string(),
        },
        CredentialSourceKind::Ssm => {
            let store = parameters
                .ok_or_else(|| AppError::Config("SSM credential source selected without a parameter store".into()))?;
            let (client_id, client_secret, callback_url) = tokio::try_join!(
                fetch(store, client_id),
                fetch(store, client_secret),
                fetch(store, callback_url),
            )?;
            ClientCredentials { client_id, client_secret, callback_url }
        }
    };

    tracing::info!(client_id = %credentials.client_id, "Resolved Forge client credentials");
    Ok(credentials)
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| AppError::Config(format!("{name} is not set")))
}

async fn fetch(store: &dyn ParameterStore, name: &str) -> Result<String> {
    match store.get(name).await {
        Ok(Some(value)) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(AppError::Config(format!("SSM parameter {name} is missing or empty"))),
        Err(e) => Err(AppError::Config(format!("{e:#}"))),
    }
}
