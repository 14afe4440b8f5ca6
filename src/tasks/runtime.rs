use async_trait::async_trait;

use super::types::{CommandError, ContainerSpec};

/// Control surface of the host container runtime.
///
/// Every call returns the diagnostic text the runtime produced, or a
/// [`CommandError`] carrying it when the call failed.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pull(&self, image: &str) -> Result<String, CommandError>;

    async fn stop(&self, container: &str) -> Result<String, CommandError>;

    async fn remove(&self, container: &str) -> Result<String, CommandError>;

    /// Starts a detached instance named after `spec` from `image`.
    async fn run(&self, spec: &ContainerSpec, image: &str) -> Result<String, CommandError>;
}
