//! Container lifecycle: the runtime seam, its two backends, and the
//! redeploy sequence run against them.

pub mod cli;
pub mod docker;
pub mod runtime;
pub mod sequence;
pub mod types;

pub use cli::DockerCli;
pub use docker::DockerEngine;
pub use runtime::ContainerRuntime;
pub use sequence::redeploy;
pub use types::{CommandError, ContainerSpec, PortMapping, RedeployReport, Step};
