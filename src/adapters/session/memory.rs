use crate::adapters::session::SessionStore;
use crate::domain::session::{Session, SessionId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// In-process session store for single-node deployments and tests.
///
/// A stale record is dropped when it is next loaded. Records that are never
/// loaded again are swept out by `save`, at most once per sweep interval.
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    entries: Arc<DashMap<SessionId, (Session, Instant)>>,
    ttl: Duration,
    created: Instant,
    last_sweep_ms: Arc<AtomicU64>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            created: Instant::now(),
            last_sweep_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired record and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, stored_until)| *stored_until > now);
        before.saturating_sub(self.entries.len())
    }

    fn sweep_if_due(&self) {
        let interval = u64::try_from(self.ttl.min(MAX_SWEEP_INTERVAL).as_millis()).unwrap_or(u64::MAX);
        let elapsed = u64::try_from(self.created.elapsed().as_millis()).unwrap_or(u64::MAX);
        let last = self.last_sweep_ms.load(Ordering::Relaxed);

        if elapsed.saturating_sub(last) < interval {
            return;
        }
        // One caller wins the slot; the others skip this round.
        if self.last_sweep_ms.compare_exchange(last, elapsed, Ordering::Relaxed, Ordering::Relaxed).is_ok() {
            let removed = self.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired sessions");
            }
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: SessionId) -> anyhow::Result<Option<Session>> {
        if let Some(entry) = self.entries.get(&id) {
            let (session, stored_until) = entry.value();
            if Instant::now() < *stored_until {
                return Ok(Some(session.clone()));
            }
        } else {
            return Ok(None);
        }

        // Guard released above; removing under it would deadlock the shard.
        self.entries.remove(&id);
        Ok(None)
    }

    async fn save(&self, id: SessionId, session: &Session) -> anyhow::Result<()> {
        self.sweep_if_due();
        self.entries.insert(id, (session.clone(), Instant::now() + self.ttl));
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> anyhow::Result<()> {
        self.entries.remove(&id);
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
