use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::runtime::ContainerRuntime;
use super::types::{CommandError, ContainerSpec};

/// Drives the runtime through its command-line client (`docker` by default).
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    timeout: Duration,
}

impl DockerCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        DockerCli {
            program: program.into(),
            timeout,
        }
    }

    pub fn run_args(spec: &ContainerSpec, image: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "-p".to_string(),
            spec.ports.to_string(),
            image.to_string(),
        ]
    }

    /// Runs one invocation to completion and returns stdout and stderr as one text.
    async fn execute(&self, args: &[String]) -> Result<String, CommandError> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!(command = %command, "Executing command");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(CommandError::Spawn { command, source }),
            Err(_) => {
                return Err(CommandError::TimedOut {
                    command,
                    timeout: self.timeout,
                });
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_string();

        if output.status.success() {
            Ok(combined)
        } else {
            Err(CommandError::Failed {
                command,
                status: output.status.to_string(),
                output: combined,
            })
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn pull(&self, image: &str) -> Result<String, CommandError> {
        self.execute(&["pull".to_string(), image.to_string()]).await
    }

    async fn stop(&self, container: &str) -> Result<String, CommandError> {
        self.execute(&["stop".to_string(), container.to_string()])
            .await
    }

    async fn remove(&self, container: &str) -> Result<String, CommandError> {
        self.execute(&["rm".to_string(), container.to_string()]).await
    }

    async fn run(&self, spec: &ContainerSpec, image: &str) -> Result<String, CommandError> {
        self.execute(&Self::run_args(spec, image)).await
    }
}
