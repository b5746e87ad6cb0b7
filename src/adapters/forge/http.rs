use crate::adapters::forge::{AuthorizationError, TokenEndpoint};
use crate::domain::credentials::{ClientCredentials, OAuthCredentials, ScopeSet};
use async_trait::async_trait;
use std::time::Duration;

const TOKEN_PATH: &str = "/authentication/v1/gettoken";
const REFRESH_PATH: &str = "/authentication/v1/refreshtoken";

/// Forge authentication service over HTTPS.
#[derive(Debug, Clone)]
pub struct ForgeTokenEndpoint {
    http: reqwest::Client,
    base_url: String,
}

impl ForgeTokenEndpoint {
    /// Builds the endpoint with a per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthorizationError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<OAuthCredentials, AuthorizationError> {
        let resp = self.http.post(format!("{}{path}", self.base_url)).form(form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthorizationError::Rejected { status: status.as_u16(), body });
        }

        let body = resp.bytes().await?;
        let credentials: OAuthCredentials = serde_json::from_slice(&body)?;
        tracing::debug!(expires_in = credentials.expires_in, "token response decoded");
        Ok(credentials)
    }
}

#[async_trait]
impl TokenEndpoint for ForgeTokenEndpoint {
    #[tracing::instrument(err(level = "warn"), skip_all, fields(scopes = %scopes))]
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        scopes: &ScopeSet,
        code: &str,
    ) -> Result<OAuthCredentials, AuthorizationError> {
        self.post_form(
            TOKEN_PATH,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", credentials.callback_url.as_str()),
            ],
        )
        .await
    }

    #[tracing::instrument(err(level = "warn"), skip_all, fields(scopes = %scopes))]
    async fn refresh(
        &self,
        credentials: &ClientCredentials,
        scopes: &ScopeSet,
        refresh_token: &str,
    ) -> Result<OAuthCredentials, AuthorizationError> {
        let scope = scopes.to_param();
        self.post_form(
            REFRESH_PATH,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", scope.as_str()),
            ],
        )
        .await
    }
}
