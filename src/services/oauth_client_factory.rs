use crate::adapters::forge::{AuthorizationError, TokenEndpoint};
use crate::config::ForgeConfig;
use crate::domain::credentials::{ClientCredentials, OAuthCredentials, ScopeSet};
use crate::error::{AppError, Result};
use std::sync::Arc;
use url::Url;

const AUTHORIZE_PATH: &str = "/authentication/v1/authorize";

/// Builds scope-bound authorization clients from the process-wide credentials.
#[derive(Clone, Debug)]
pub struct OAuthClientFactory {
    credentials: Arc<ClientCredentials>,
    endpoint: Arc<dyn TokenEndpoint>,
    scope_internal: ScopeSet,
    scope_public: ScopeSet,
    base_url: String,
}

impl OAuthClientFactory {
    #[must_use]
    pub fn new(credentials: ClientCredentials, endpoint: Arc<dyn TokenEndpoint>, config: &ForgeConfig) -> Self {
        Self {
            credentials: Arc::new(credentials),
            endpoint,
            scope_internal: config.scope_internal.iter().cloned().collect(),
            scope_public: config.scope_public.iter().cloned().collect(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// A client requesting `scopes`, good for one exchange or refresh.
    #[must_use]
    pub fn client(&self, scopes: ScopeSet) -> AuthorizationClient {
        AuthorizationClient {
            credentials: Arc::clone(&self.credentials),
            endpoint: Arc::clone(&self.endpoint),
            scopes,
        }
    }

    #[must_use]
    pub fn internal_client(&self) -> AuthorizationClient {
        self.client(self.scope_internal.clone())
    }

    #[must_use]
    pub fn public_client(&self) -> AuthorizationClient {
        self.client(self.scope_public.clone())
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    /// Where to send the user to grant the internal scopes.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the configured base URL is not a valid URL.
    pub fn authorize_url(&self) -> Result<String> {
        let mut url = Url::parse(&format!("{}{AUTHORIZE_PATH}", self.base_url))
            .map_err(|e| AppError::Config(format!("invalid Forge base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("redirect_uri", &self.credentials.callback_url)
            .append_pair("scope", &self.scope_internal.to_param());

        Ok(url.into())
    }
}

/// Stateless handle bound to one scope set.
#[derive(Clone, Debug)]
pub struct AuthorizationClient {
    credentials: Arc<ClientCredentials>,
    endpoint: Arc<dyn TokenEndpoint>,
    scopes: ScopeSet,
}

impl AuthorizationClient {
    #[must_use]
    pub const fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    /// Redeems an authorization code.
    ///
    /// # Errors
    /// Propagates the authorization service failure unchanged.
    pub async fn get_token(&self, code: &str) -> std::result::Result<OAuthCredentials, AuthorizationError> {
        self.endpoint.exchange_code(&self.credentials, &self.scopes, code).await
    }

    /// Refreshes into a token carrying this client's scopes.
    ///
    /// # Errors
    /// Propagates the authorization service failure unchanged.
    pub async fn refresh_token(&self, refresh_token: &str) -> std::result::Result<OAuthCredentials, AuthorizationError> {
        self.endpoint.refresh(&self.credentials, &self.scopes, refresh_token).await
    }
}
