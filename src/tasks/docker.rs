use std::{collections::HashMap, future::Future, time::Duration};

use async_trait::async_trait;
use bollard::{
    Docker,
    container::{
        Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
        StopContainerOptions,
    },
    image::CreateImageOptions,
    models::{HostConfig, PortBinding},
};
use futures_util::stream::StreamExt;
use tracing::{debug, info};

use super::runtime::ContainerRuntime;
use super::types::{CommandError, ContainerSpec};

/// Seconds the daemon waits for a graceful stop before killing the container.
const STOP_GRACE_SECS: i64 = 10;

/// Drives the local Docker daemon over its engine API instead of the CLI.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    client: Docker,
    timeout: Duration,
}

impl DockerEngine {
    pub fn connect(timeout: Duration) -> Result<Self, bollard::errors::Error> {
        let client = Docker::connect_with_local_defaults()?;
        Ok(DockerEngine { client, timeout })
    }

    async fn bounded<T, F>(
        &self,
        action: &'static str,
        target: &str,
        fut: F,
    ) -> Result<T, CommandError>
    where
        F: Future<Output = Result<T, bollard::errors::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(CommandError::Engine {
                action,
                target: target.to_string(),
                source,
            }),
            Err(_) => Err(CommandError::TimedOut {
                command: format!("{} {}", action, target),
                timeout: self.timeout,
            }),
        }
    }
}

/// Builds the create-container body for `spec`, publishing its single port.
pub fn container_config(spec: &ContainerSpec, image: &str) -> Config<String> {
    let key = spec.ports.container_key();

    let binding = PortBinding {
        host_ip: spec.ports.host_ip.clone(),
        host_port: Some(spec.ports.host_port.to_string()),
    };

    let host_config = HostConfig {
        port_bindings: Some(HashMap::from([(key.clone(), Some(vec![binding]))])),
        ..Default::default()
    };

    Config {
        image: Some(image.to_string()),
        exposed_ports: Some(HashMap::from([(key, HashMap::new())])),
        host_config: Some(host_config),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerRuntime for DockerEngine {
    async fn pull(&self, image: &str) -> Result<String, CommandError> {
        info!(image = %image, "Pulling image");

        let drain = async {
            let mut stream = Box::pin(self.client.create_image(
                Some(CreateImageOptions {
                    from_image: image.to_string(),
                    ..Default::default()
                }),
                None,
                None,
            ));

            let mut last_status = String::new();
            while let Some(msg) = stream.next().await {
                let progress = msg?;
                if let Some(status) = progress.status {
                    debug!(image = %image, status = %status, "Pull progress");
                    last_status = status;
                }
            }
            Ok::<_, bollard::errors::Error>(last_status)
        };

        self.bounded("pull", image, drain).await
    }

    async fn stop(&self, container: &str) -> Result<String, CommandError> {
        self.bounded(
            "stop",
            container,
            self.client
                .stop_container(container, Some(StopContainerOptions { t: STOP_GRACE_SECS })),
        )
        .await?;
        Ok(container.to_string())
    }

    async fn remove(&self, container: &str) -> Result<String, CommandError> {
        self.bounded(
            "remove",
            container,
            self.client
                .remove_container(container, None::<RemoveContainerOptions>),
        )
        .await?;
        Ok(container.to_string())
    }

    async fn run(&self, spec: &ContainerSpec, image: &str) -> Result<String, CommandError> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let created = self
            .bounded(
                "create",
                &spec.name,
                self.client
                    .create_container(Some(options), container_config(spec, image)),
            )
            .await?;
        debug!(container = %spec.name, id = %created.id, "Container created");

        self.bounded(
            "start",
            &spec.name,
            self.client
                .start_container(&created.id, None::<StartContainerOptions<String>>),
        )
        .await?;

        Ok(created.id)
    }
}
