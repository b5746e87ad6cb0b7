use crate::domain::session::{Session, SessionId};
use async_trait::async_trait;

pub mod memory;

pub use memory::MemorySessionStore;

/// Persistence for per-user token sessions.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Loads a session, or `None` if it is unknown or has expired.
    ///
    /// # Errors
    /// Returns an error if the backing store fails or holds an undecodable record.
    async fn load(&self, id: SessionId) -> anyhow::Result<Option<Session>>;

    /// Writes the session, replacing any previous record and resetting its TTL.
    ///
    /// # Errors
    /// Returns an error if the backing store fails.
    async fn save(&self, id: SessionId, session: &Session) -> anyhow::Result<()>;

    /// Removes the session. Deleting an unknown id is not an error.
    ///
    /// # Errors
    /// Returns an error if the backing store fails.
    async fn delete(&self, id: SessionId) -> anyhow::Result<()>;

    /// Checks connectivity to the backing store.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    async fn ping(&self) -> anyhow::Result<()>;
}
