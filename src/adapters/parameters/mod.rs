use async_trait::async_trait;

pub mod ssm;

pub use ssm::SsmParameterStore;

/// Read-only lookup of named secrets.
#[async_trait]
pub trait ParameterStore: Send + Sync + std::fmt::Debug {
    /// Returns the value stored under `name`, or `None` if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the store cannot be reached.
    async fn get(&self, name: &str) -> anyhow::Result<Option<String>>;
}
