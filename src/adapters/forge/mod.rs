use crate::domain::credentials::{ClientCredentials, OAuthCredentials, ScopeSet};
use async_trait::async_trait;
use thiserror::Error;

pub mod http;

pub use http::ForgeTokenEndpoint;

#[derive(Error, Debug)]
pub enum AuthorizationError {
    #[error("request to the authorization service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("authorization service returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("malformed token response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("token response carried an unusable expires_in of {0}")]
    InvalidExpiry(i64),
    #[error("session has not completed authorization")]
    NotAuthorized,
}

/// Transport to the OAuth token endpoint.
#[async_trait]
pub trait TokenEndpoint: Send + Sync + std::fmt::Debug {
    /// Redeems an authorization code.
    ///
    /// # Errors
    /// Returns `AuthorizationError` if the code is rejected, the service is
    /// unreachable, or the response cannot be decoded.
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        scopes: &ScopeSet,
        code: &str,
    ) -> Result<OAuthCredentials, AuthorizationError>;

    /// Trades a refresh token for new credentials limited to `scopes`.
    ///
    /// # Errors
    /// Returns `AuthorizationError` if the refresh token is rejected, the
    /// service is unreachable, or the response cannot be decoded.
    async fn refresh(
        &self,
        credentials: &ClientCredentials,
        scopes: &ScopeSet,
        refresh_token: &str,
    ) -> Result<OAuthCredentials, AuthorizationError>;
}
