pub mod api;
pub mod types;
pub mod worker;

pub use api::{AppState, WebhookServer, build_router};
pub use types::{DeployJob, DeploymentId, DispatchError, WorkerSummary};
pub use worker::Dispatcher;
