use std::{fmt, sync::Arc};

use thiserror::Error;
use uuid::Uuid;

use crate::tasks::{ContainerRuntime, ContainerSpec};

/// Correlates the log lines of one redeploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeploymentId(Uuid);

impl DeploymentId {
    pub fn new() -> Self {
        DeploymentId(Uuid::new_v4())
    }
}

impl Default for DeploymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct DeployJob {
    pub id: DeploymentId,
    pub image: String,
}

/// Runs the redeploys of one container, one job at a time.
pub struct ContainerWorker {
    pub spec: ContainerSpec,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub completed: u64,
    pub failed: u64,
}

/// What a worker got through before it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub container: String,
    pub completed: u64,
    pub failed: u64,
    /// Jobs still queued when shutdown began. They are logged, never run.
    pub dropped: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatcher is shutting down")]
    ShuttingDown,

    #[error("worker for container {0} stopped accepting jobs")]
    ChannelClosed(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
