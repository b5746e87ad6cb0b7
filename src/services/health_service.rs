use crate::adapters::session::SessionStore;
use crate::config::HealthConfig;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("viewhub-auth");
        Self {
            status: meter
                .i64_gauge("viewhub_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    sessions: Arc<dyn SessionStore>,
    config: HealthConfig,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>, config: HealthConfig) -> Self {
        Self { sessions, config, metrics: Metrics::new() }
    }

    /// Checks session store connectivity.
    ///
    /// # Errors
    /// Returns a string describing the failure if the store is unreachable.
    pub async fn check_session_store(&self) -> Result<(), String> {
        let store_timeout = Duration::from_millis(self.config.session_store_timeout_ms);

        match timeout(store_timeout, self.sessions.ping()).await {
            Ok(Ok(())) => {
                self.metrics.status.record(1, &[KeyValue::new("component", "session_store")]);
                Ok(())
            }
            Ok(Err(e)) => {
                self.metrics.status.record(0, &[KeyValue::new("component", "session_store")]);
                Err(format!("Session store connection failed: {e:?}"))
            }
            Err(_) => {
                self.metrics.status.record(0, &[KeyValue::new("component", "session_store")]);
                Err("Session store connection timed out".to_string())
            }
        }
    }
}
