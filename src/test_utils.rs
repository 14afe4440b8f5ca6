//! Test doubles shared across module tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::tasks::runtime::ContainerRuntime;
use crate::tasks::types::{CommandError, ContainerSpec, PortMapping, Step};

/// A call observed by [`RecordingRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Pull(String),
    Stop(String),
    Remove(String),
    Run {
        container: String,
        ports: String,
        image: String,
    },
}

impl RuntimeCall {
    pub fn step(&self) -> Step {
        match self {
            RuntimeCall::Pull(_) => Step::Pull,
            RuntimeCall::Stop(_) => Step::Stop,
            RuntimeCall::Remove(_) => Step::Remove,
            RuntimeCall::Run { .. } => Step::Run,
        }
    }
}

/// In-memory runtime that records every call and fails the configured steps.
#[derive(Default)]
pub struct RecordingRuntime {
    calls: Mutex<Vec<RuntimeCall>>,
    failing: HashSet<Step>,
    delay: Option<Duration>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the given steps report `No such container`-style failures.
    pub fn failing(mut self, steps: &[Step]) -> Self {
        self.failing.extend(steps.iter().copied());
        self
    }

    /// Sleeps before recording each call, widening interleaving windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Polls until at least `count` calls were recorded or two seconds pass.
    pub async fn wait_for_calls(&self, count: usize) -> Vec<RuntimeCall> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let calls = self.calls();
            if calls.len() >= count || tokio::time::Instant::now() >= deadline {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn record(&self, call: RuntimeCall) -> Result<String, CommandError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let step = call.step();
        self.calls.lock().unwrap().push(call);

        if self.failing.contains(&step) {
            Err(CommandError::Failed {
                command: format!("docker {}", step),
                status: "exit status: 1".to_string(),
                output: "Error response from daemon: No such container".to_string(),
            })
        } else {
            Ok(String::new())
        }
    }
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    async fn pull(&self, image: &str) -> Result<String, CommandError> {
        self.record(RuntimeCall::Pull(image.to_string())).await
    }

    async fn stop(&self, container: &str) -> Result<String, CommandError> {
        self.record(RuntimeCall::Stop(container.to_string())).await
    }

    async fn remove(&self, container: &str) -> Result<String, CommandError> {
        self.record(RuntimeCall::Remove(container.to_string())).await
    }

    async fn run(&self, spec: &ContainerSpec, image: &str) -> Result<String, CommandError> {
        self.record(RuntimeCall::Run {
            container: spec.name.clone(),
            ports: spec.ports.to_string(),
            image: image.to_string(),
        })
        .await
    }
}

pub fn test_container() -> ContainerSpec {
    ContainerSpec::new(
        "video-converter-back",
        "5104:80".parse::<PortMapping>().unwrap(),
    )
}

/// The four calls one redeploy of `image` onto [`test_container`] issues.
pub fn expected_sequence(image: &str) -> Vec<RuntimeCall> {
    vec![
        RuntimeCall::Pull(image.to_string()),
        RuntimeCall::Stop("video-converter-back".to_string()),
        RuntimeCall::Remove("video-converter-back".to_string()),
        RuntimeCall::Run {
            container: "video-converter-back".to_string(),
            ports: "5104:80".to_string(),
            image: image.to_string(),
        },
    ]
}
