//! Process configuration, read once at startup from flags or environment.

use std::{net::SocketAddr, time::Duration};

use clap::{Parser, ValueEnum, builder::NonEmptyStringValueParser};
use secrecy::SecretString;

use crate::tasks::{ContainerSpec, PortMapping};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuntimeKind {
    /// Invoke the `docker` command-line client.
    Cli,
    /// Talk to the Docker Engine API over the local socket.
    Engine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// GitHub package webhook receiver that redeploys one container.
#[derive(Parser)]
#[command(name = "ci-update-server", version, about)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "CI_UPDATE_LISTEN", default_value = "0.0.0.0:27075")]
    pub listen: SocketAddr,

    /// Shared secret configured on the GitHub webhook.
    #[arg(
        long,
        env = "GITHUB_WEBHOOK_SECRET_TOKEN",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new()
    )]
    webhook_secret: String,

    /// Name of the managed container.
    #[arg(
        long,
        env = "CI_UPDATE_CONTAINER_NAME",
        default_value = "video-converter-back",
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub container_name: String,

    /// Port mapping passed to the new container, `[ip:]host:container[/proto]`.
    /// IPv6 host addresses go in brackets (`[::1]:5104:80`). Port ranges are
    /// not supported.
    #[arg(long, env = "CI_UPDATE_PUBLISH", default_value = "5104:80")]
    pub publish: PortMapping,

    /// How to reach the container runtime.
    #[arg(long, value_enum, env = "CI_UPDATE_RUNTIME", default_value_t = RuntimeKind::Cli)]
    pub runtime: RuntimeKind,

    /// Runtime client binary used by the `cli` runtime.
    #[arg(long, env = "CI_UPDATE_DOCKER_BIN", default_value = "docker")]
    pub docker_bin: String,

    /// Upper bound for each runtime call, in seconds.
    #[arg(long, env = "CI_UPDATE_COMMAND_TIMEOUT_SECS", default_value_t = 300)]
    pub command_timeout_secs: u64,

    /// Log output format.
    #[arg(long, value_enum, env = "CI_UPDATE_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn webhook_secret(&self) -> SecretString {
        SecretString::from(self.webhook_secret.clone())
    }

    pub fn container(&self) -> ContainerSpec {
        ContainerSpec::new(self.container_name.clone(), self.publish.clone())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
