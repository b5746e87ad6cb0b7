use crate::adapters::forge::AuthorizationError;
use crate::domain::credentials::OAuthCredentials;
use crate::domain::session::{AccessToken, Session, TokenState};
use crate::services::oauth_client_factory::OAuthClientFactory;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use time::OffsetDateTime;

type Result<T> = std::result::Result<T, AuthorizationError>;

#[derive(Clone, Debug)]
struct Metrics {
    code_exchanges_total: Counter<u64>,
    token_refreshes_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("viewhub-auth");
        Self {
            code_exchanges_total: meter
                .u64_counter("oauth_code_exchanges_total")
                .with_description("Authorization codes exchanged for session tokens")
                .build(),
            token_refreshes_total: meter
                .u64_counter("oauth_token_refreshes_total")
                .with_description("Refresh cycles performed for expired sessions")
                .build(),
        }
    }

    fn record<T>(counter: &Counter<u64>, result: &Result<T>) {
        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter.add(1, &[KeyValue::new("result", outcome)]);
    }
}

/// Long-lived entry point that opens a [`TokenBroker`] per request.
#[derive(Clone, Debug)]
pub struct TokenService {
    clients: Arc<OAuthClientFactory>,
    metrics: Metrics,
}

impl TokenService {
    #[must_use]
    pub fn new(clients: Arc<OAuthClientFactory>) -> Self {
        Self { clients, metrics: Metrics::new() }
    }

    #[must_use]
    pub fn clients(&self) -> &OAuthClientFactory {
        &self.clients
    }

    /// Takes ownership of one session record for the duration of a request.
    #[must_use]
    pub fn broker(&self, session: Session) -> TokenBroker<'_> {
        TokenBroker { clients: &self.clients, metrics: &self.metrics, session }
    }
}

/// Token state machine over a single session record.
///
/// Operations mutate the broker's own copy; the caller persists the result
/// of [`TokenBroker::into_session`]. A failed exchange or refresh leaves the
/// record exactly as it was.
#[derive(Debug)]
pub struct TokenBroker<'a> {
    clients: &'a OAuthClientFactory,
    metrics: &'a Metrics,
    session: Session,
}

impl TokenBroker<'_> {
    /// True once a public token has been stored. Expiry is not checked.
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        self.session.is_authorized()
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn into_session(self) -> Session {
        self.session
    }

    /// Redeems the authorization code and derives the public token from it.
    ///
    /// The code can only be redeemed once, so the public token comes from a
    /// scope-narrowing refresh of the internal credentials.
    ///
    /// # Errors
    /// Propagates any authorization service failure; the session is unchanged.
    #[tracing::instrument(err(level = "warn"), skip_all)]
    pub async fn exchange_code(&mut self, code: &str) -> Result<()> {
        let result = self.run_exchange(code).await;
        Metrics::record(&self.metrics.code_exchanges_total, &result);
        result
    }

    /// Renews both tokens from the stored refresh token.
    ///
    /// # Errors
    /// Returns `AuthorizationError::NotAuthorized` without calling upstream if
    /// the session holds no refresh token, and otherwise propagates any
    /// authorization service failure. The session is unchanged on error.
    #[tracing::instrument(err(level = "warn"), skip_all)]
    pub async fn refresh(&mut self) -> Result<()> {
        let result = self.run_refresh().await;
        Metrics::record(&self.metrics.token_refreshes_total, &result);
        result
    }

    /// The viewer-only token, refreshed first if the session has expired.
    ///
    /// # Errors
    /// Propagates a failed refresh.
    pub async fn public_token(&mut self) -> Result<AccessToken> {
        self.refresh_if_expired().await?;
        let access_token = self.session.public_token.clone().ok_or(AuthorizationError::NotAuthorized)?;
        Ok(AccessToken { access_token, expires_in: self.session.expires_in_at(OffsetDateTime::now_utc()) })
    }

    /// The broad-scope token, refreshed first if the session has expired.
    ///
    /// Expiry is tracked on the public token only; both tiers renew together.
    ///
    /// # Errors
    /// Propagates a failed refresh.
    pub async fn internal_token(&mut self) -> Result<AccessToken> {
        self.refresh_if_expired().await?;
        let access_token = self.session.internal_token.clone().ok_or(AuthorizationError::NotAuthorized)?;
        Ok(AccessToken { access_token, expires_in: self.session.expires_in_at(OffsetDateTime::now_utc()) })
    }

    async fn run_exchange(&mut self, code: &str) -> Result<()> {
        let internal = self.clients.internal_client().get_token(code).await?;
        self.derive_public(internal).await
    }

    async fn run_refresh(&mut self) -> Result<()> {
        let refresh_token = self.session.refresh_token.clone().ok_or(AuthorizationError::NotAuthorized)?;
        let internal = self.clients.internal_client().refresh_token(&refresh_token).await?;
        self.derive_public(internal).await
    }

    async fn refresh_if_expired(&mut self) -> Result<()> {
        match self.session.state_at(OffsetDateTime::now_utc()) {
            TokenState::Valid => Ok(()),
            TokenState::Expired => {
                tracing::debug!("Session tokens expired, refreshing");
                self.refresh().await
            }
            TokenState::Unauthenticated => Err(AuthorizationError::NotAuthorized),
        }
    }

    async fn derive_public(&mut self, internal: OAuthCredentials) -> Result<()> {
        let public_client = self.clients.public_client();
        let public = public_client.refresh_token(&internal.refresh_token).await?;

        let expires_at = Session::expiry_after(OffsetDateTime::now_utc(), public.expires_in)
            .ok_or(AuthorizationError::InvalidExpiry(public.expires_in))?;

        self.session.store_tokens(internal.access_token, public.access_token, public.refresh_token, expires_at);
        tracing::info!(expires_in = public.expires_in, "Session tokens stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::forge::TokenEndpoint;
    use crate::config::ForgeConfig;
    use crate::domain::credentials::{ClientCredentials, ScopeSet};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Call {
        grant: &'static str,
        scopes: String,
        input: String,
    }

    /// Scripted authorization service recording every call.
    ///
    /// Code exchange yields `INT1/REF1/3600`. The n-th refresh yields
    /// `PUB{n}/REF{n+1}/1800` for the viewer scope and `INT-R{n}/RT-I{n}/3600`
    /// for anything else.
    #[derive(Debug, Default)]
    struct StubEndpoint {
        calls: Mutex<Vec<Call>>,
        fail_refresh: AtomicBool,
        fail_code: AtomicBool,
        overflow_expiry: AtomicBool,
    }

    impl StubEndpoint {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, grant: &'static str, scopes: &ScopeSet, input: &str) -> usize {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call { grant, scopes: scopes.to_param(), input: input.to_string() });
            calls.iter().filter(|c| c.grant == "refresh").count()
        }
    }

    fn creds(access: &str, refresh: &str, expires_in: i64) -> OAuthCredentials {
        OAuthCredentials { access_token: access.to_string(), refresh_token: refresh.to_string(), expires_in }
    }

    fn rejected() -> AuthorizationError {
        AuthorizationError::Rejected { status: 400, body: "invalid_grant".to_string() }
    }

    #[async_trait]
    impl TokenEndpoint for StubEndpoint {
        async fn exchange_code(
            &self,
            _credentials: &ClientCredentials,
            scopes: &ScopeSet,
            code: &str,
        ) -> Result<OAuthCredentials> {
            self.record("code", scopes, code);
            if self.fail_code.load(Ordering::SeqCst) {
                return Err(rejected());
            }
            Ok(creds("INT1", "REF1", 3600))
        }

        async fn refresh(
            &self,
            _credentials: &ClientCredentials,
            scopes: &ScopeSet,
            refresh_token: &str,
        ) -> Result<OAuthCredentials> {
            let n = self.record("refresh", scopes, refresh_token);
            if self.fail_refresh.load(Ordering::SeqCst) {
                return Err(rejected());
            }
            if scopes.to_param() == "viewables:read" {
                let expires_in = if self.overflow_expiry.load(Ordering::SeqCst) { i64::MAX } else { 1800 };
                Ok(creds(&format!("PUB{n}"), &format!("REF{}", n + 1), expires_in))
            } else {
                Ok(creds(&format!("INT-R{n}"), &format!("RT-I{n}"), 3600))
            }
        }
    }

    fn setup() -> (Arc<StubEndpoint>, TokenService) {
        let endpoint = Arc::new(StubEndpoint::default());
        let credentials = ClientCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            callback_url: "http://localhost/cb".to_string(),
        };
        let factory = OAuthClientFactory::new(
            credentials,
            Arc::clone(&endpoint) as Arc<dyn TokenEndpoint>,
            &ForgeConfig::default(),
        );
        (endpoint, TokenService::new(Arc::new(factory)))
    }

    fn session_expiring_at(expires_at: OffsetDateTime) -> Session {
        Session {
            internal_token: Some("INT-OLD".to_string()),
            public_token: Some("PUB-OLD".to_string()),
            refresh_token: Some("REF-OLD".to_string()),
            expires_at: Some(expires_at),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_stores_public_refresh_handle() {
        let (endpoint, service) = setup();
        let mut broker = service.broker(Session::default());

        let before = OffsetDateTime::now_utc();
        broker.exchange_code("ABC123").await.unwrap();
        let session = broker.into_session();

        assert_eq!(session.internal_token.as_deref(), Some("INT1"));
        assert_eq!(session.public_token.as_deref(), Some("PUB1"));
        assert_eq!(session.refresh_token.as_deref(), Some("REF2"));

        let expires_at = session.expires_at.unwrap();
        assert!(expires_at >= before + Duration::seconds(1800));
        assert!(expires_at <= OffsetDateTime::now_utc() + Duration::seconds(1800));

        assert_eq!(
            endpoint.calls(),
            vec![
                Call {
                    grant: "code",
                    scopes: "data:read data:create data:write viewables:read".to_string(),
                    input: "ABC123".to_string()
                },
                Call { grant: "refresh", scopes: "viewables:read".to_string(), input: "REF1".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_exchange_code_authorizes_with_distinct_tokens() {
        let (_endpoint, service) = setup();
        let mut broker = service.broker(Session::default());
        assert!(!broker.is_authorized());

        broker.exchange_code("ABC123").await.unwrap();

        assert!(broker.is_authorized());
        let internal = broker.internal_token().await.unwrap();
        let public = broker.public_token().await.unwrap();
        assert_ne!(internal.access_token, public.access_token);
    }

    #[tokio::test]
    async fn test_valid_session_does_not_refresh() {
        let (endpoint, service) = setup();
        let mut broker = service.broker(session_expiring_at(OffsetDateTime::now_utc() + Duration::minutes(30)));

        let first = broker.public_token().await.unwrap();
        let second = broker.public_token().await.unwrap();
        let internal = broker.internal_token().await.unwrap();

        assert!(endpoint.calls().is_empty());
        assert_eq!(first.access_token, "PUB-OLD");
        assert_eq!(second.access_token, first.access_token);
        assert_eq!(internal.access_token, "INT-OLD");
    }

    #[tokio::test]
    async fn test_expired_session_runs_one_refresh_cycle() {
        let (endpoint, service) = setup();
        let mut broker = service.broker(session_expiring_at(OffsetDateTime::now_utc() - Duration::seconds(5)));

        let token = broker.public_token().await.unwrap();

        assert_eq!(
            endpoint.calls(),
            vec![
                Call {
                    grant: "refresh",
                    scopes: "data:read data:create data:write viewables:read".to_string(),
                    input: "REF-OLD".to_string()
                },
                Call { grant: "refresh", scopes: "viewables:read".to_string(), input: "RT-I1".to_string() },
            ]
        );
        assert_eq!(token.access_token, "PUB2");
        assert!((1799..=1800).contains(&token.expires_in));

        let session = broker.into_session();
        assert_eq!(session.internal_token.as_deref(), Some("INT-R1"));
        assert_eq!(session.refresh_token.as_deref(), Some("REF3"));
    }

    #[tokio::test]
    async fn test_internal_token_is_gated_by_public_expiry() {
        let (endpoint, service) = setup();
        let mut broker = service.broker(session_expiring_at(OffsetDateTime::now_utc() - Duration::seconds(5)));

        let token = broker.internal_token().await.unwrap();

        assert_eq!(endpoint.calls().len(), 2);
        assert_eq!(token.access_token, "INT-R1");
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_session_untouched() {
        let (endpoint, service) = setup();
        endpoint.fail_refresh.store(true, Ordering::SeqCst);
        let original = session_expiring_at(OffsetDateTime::now_utc() - Duration::seconds(5));
        let mut broker = service.broker(original.clone());

        let err = broker.public_token().await.unwrap_err();

        assert!(matches!(err, AuthorizationError::Rejected { status: 400, .. }));
        assert_eq!(endpoint.calls().len(), 1, "no retry after a rejected refresh");
        assert_eq!(broker.into_session(), original);
    }

    #[tokio::test]
    async fn test_failed_code_exchange_stays_unauthenticated() {
        let (endpoint, service) = setup();
        endpoint.fail_code.store(true, Ordering::SeqCst);
        let mut broker = service.broker(Session::default());

        assert!(broker.exchange_code("stale").await.is_err());

        assert_eq!(endpoint.calls().len(), 1);
        assert!(!broker.is_authorized());
        assert_eq!(broker.into_session(), Session::default());
    }

    #[tokio::test]
    async fn test_out_of_range_expiry_is_rejected_without_touching_session() {
        let (endpoint, service) = setup();
        endpoint.overflow_expiry.store(true, Ordering::SeqCst);

        let mut broker = service.broker(Session::default());
        let err = broker.exchange_code("X").await.unwrap_err();
        assert!(matches!(err, AuthorizationError::InvalidExpiry(i64::MAX)));
        assert_eq!(broker.into_session(), Session::default());

        let original = session_expiring_at(OffsetDateTime::now_utc() - Duration::seconds(5));
        let mut broker = service.broker(original.clone());
        assert!(matches!(broker.public_token().await, Err(AuthorizationError::InvalidExpiry(_))));
        assert_eq!(broker.into_session(), original);
    }

    #[tokio::test]
    async fn test_unauthenticated_session_has_no_tokens() {
        let (endpoint, service) = setup();
        let mut broker = service.broker(Session::default());

        assert!(matches!(broker.public_token().await, Err(AuthorizationError::NotAuthorized)));
        assert!(matches!(broker.internal_token().await, Err(AuthorizationError::NotAuthorized)));
        assert!(endpoint.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_skips_upstream() {
        let (endpoint, service) = setup();
        let mut broker = service.broker(Session::default());

        assert!(matches!(broker.refresh().await, Err(AuthorizationError::NotAuthorized)));
        assert!(endpoint.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expires_in_decreases_over_time() {
        let (_endpoint, service) = setup();
        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(120);
        let mut broker = service.broker(session_expiring_at(expires_at));

        let first = broker.public_token().await.unwrap();
        assert!((119..=120).contains(&first.expires_in));

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let second = broker.public_token().await.unwrap();
        assert!(second.expires_in < first.expires_in);
        assert_eq!(second.access_token, first.access_token);
    }
}
