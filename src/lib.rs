#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;

use crate::adapters::forge::{ForgeTokenEndpoint, TokenEndpoint};
use crate::adapters::parameters::{ParameterStore, SsmParameterStore};
use crate::adapters::redis::{RedisClient, RedisSessionStore};
use crate::adapters::session::{MemorySessionStore, SessionStore};
use crate::api::{AppState, MgmtState};
use crate::config::{Config, CredentialSourceKind, SessionConfig};
use crate::domain::credentials::ClientCredentials;
use crate::services::credential_service::resolve_client_credentials;
use crate::services::health_service::HealthService;
use crate::services::oauth_client_factory::OAuthClientFactory;
use crate::services::token_broker::TokenService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Fully wired application state for both routers.
#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub mgmt_state: MgmtState,
}

/// Wires collaborators together. Anything not supplied is built from the config.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    sessions: Option<Arc<dyn SessionStore>>,
    endpoint: Option<Arc<dyn TokenEndpoint>>,
    parameters: Option<Arc<dyn ParameterStore>>,
    credentials: Option<ClientCredentials>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, sessions: None, endpoint: None, parameters: None, credentials: None }
    }

    #[must_use]
    pub fn with_session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    #[must_use]
    pub fn with_token_endpoint(mut self, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    #[must_use]
    pub fn with_parameter_store(mut self, parameters: Arc<dyn ParameterStore>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: ClientCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Resolves credentials and connects the session store.
    ///
    /// # Errors
    /// Returns an error if credentials cannot be resolved, the session store
    /// cannot be reached, or the HTTP client cannot be built.
    pub async fn build(self) -> anyhow::Result<App> {
        let config = self.config;

        let credentials = match self.credentials {
            Some(credentials) => credentials,
            None => {
                let parameters = match (self.parameters, config.forge.credential_source) {
                    (Some(parameters), _) => Some(parameters),
                    (None, CredentialSourceKind::Ssm) => {
                        Some(Arc::new(SsmParameterStore::from_env(config.forge.aws_region.clone()).await)
                            as Arc<dyn ParameterStore>)
                    }
                    (None, CredentialSourceKind::Env) => None,
                };
                resolve_client_credentials(&config.forge, parameters.as_deref()).await?
            }
        };

        let endpoint: Arc<dyn TokenEndpoint> = match self.endpoint {
            Some(endpoint) => endpoint,
            None => Arc::new(ForgeTokenEndpoint::new(
                &config.forge.base_url,
                Duration::from_secs(config.forge.timeout_secs),
            )?),
        };

        let sessions = match self.sessions {
            Some(sessions) => sessions,
            None => build_session_store(&config.session).await?,
        };

        let clients = Arc::new(OAuthClientFactory::new(credentials, endpoint, &config.forge));
        let health_service = HealthService::new(Arc::clone(&sessions), config.health.clone());

        Ok(App {
            state: AppState { config, tokens: TokenService::new(clients), sessions },
            mgmt_state: MgmtState { health_service },
        })
    }
}

/// Redis-backed store when a URL is configured, in-memory otherwise.
///
/// # Errors
/// Returns an error if Redis stays unreachable after retries.
pub async fn build_session_store(config: &SessionConfig) -> anyhow::Result<Arc<dyn SessionStore>> {
    if let Some(url) = &config.redis_url {
        let redis = RedisClient::connect(url, config).await?;
        Ok(Arc::new(RedisSessionStore::new(redis, config.key_prefix.clone(), config.ttl_secs)))
    } else {
        tracing::warn!("No session store URL configured; sessions are kept in memory");
        Ok(Arc::new(MemorySessionStore::new(Duration::from_secs(config.ttl_secs))))
    }
}

/// Flips `shutdown_tx` on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through `tracing` so they reach the configured log sinks.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_default();
        tracing::error!(panic = %info, location = %location, "Unhandled panic");
    }));
}
