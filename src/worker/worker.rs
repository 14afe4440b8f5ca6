//! Per-container redeploy queues.
//!
//! Every managed container gets one worker task fed by its own channel, so
//! redeploys of the same container never interleave while callers only pay
//! for a channel send. Workers are spawned lazily on the first job.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::types::{
    ContainerWorker, DeployJob, DeploymentId, DispatchError, DispatchResult, WorkerSummary,
};
use crate::tasks::{ContainerRuntime, ContainerSpec, RedeployReport, redeploy};

impl ContainerWorker {
    pub fn new(spec: ContainerSpec, runtime: Arc<dyn ContainerRuntime>) -> Self {
        ContainerWorker {
            spec,
            runtime,
            completed: 0,
            failed: 0,
        }
    }

    async fn process(&mut self, job: DeployJob) -> RedeployReport {
        let span = info_span!(
            "deployment",
            deployment_id = %job.id,
            container = %self.spec.name,
        );

        let report = redeploy(self.runtime.as_ref(), &self.spec, &job.image)
            .instrument(span)
            .await;

        if report.failed() {
            self.failed += 1;
        } else {
            self.completed += 1;
        }
        report
    }

    /// Drains `rx` until it closes or `cancel` fires. A job already running
    /// is finished before the worker exits; jobs still queued at that point
    /// are logged and dropped.
    pub async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<DeployJob>,
        cancel: CancellationToken,
    ) -> WorkerSummary {
        info!(container = %self.spec.name, "Worker started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                job = rx.recv() => match job {
                    Some(job) => {
                        self.process(job).await;
                    }
                    None => break,
                },
            }
        }

        rx.close();
        let mut dropped: u64 = 0;
        while let Ok(job) = rx.try_recv() {
            warn!(
                deployment_id = %job.id,
                image = %job.image,
                container = %self.spec.name,
                "Dropping queued redeploy on shutdown"
            );
            dropped += 1;
        }

        info!(
            container = %self.spec.name,
            completed = self.completed,
            failed = self.failed,
            dropped,
            "Worker stopped"
        );
        WorkerSummary {
            container: self.spec.name,
            completed: self.completed,
            failed: self.failed,
            dropped,
        }
    }
}

struct WorkerHandle {
    tx: mpsc::UnboundedSender<DeployJob>,
    task: JoinHandle<WorkerSummary>,
}

/// Routes redeploy jobs to the worker owning the target container.
pub struct Dispatcher {
    runtime: Arc<dyn ContainerRuntime>,
    workers: RwLock<HashMap<String, WorkerHandle>>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Dispatcher {
            runtime,
            workers: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Queues a redeploy of `image` onto `spec` and returns without waiting for it.
    pub async fn submit(&self, spec: &ContainerSpec, image: String) -> DispatchResult<DeploymentId> {
        if self.shutdown.is_cancelled() {
            return Err(DispatchError::ShuttingDown);
        }

        let job = DeployJob {
            id: DeploymentId::new(),
            image,
        };
        let id = job.id;

        let tx = self.get_or_spawn_worker(spec).await;
        tx.send(job)
            .map_err(|_| DispatchError::ChannelClosed(spec.name.clone()))?;

        debug!(deployment_id = %id, container = %spec.name, "Redeploy queued");
        Ok(id)
    }

    async fn get_or_spawn_worker(&self, spec: &ContainerSpec) -> mpsc::UnboundedSender<DeployJob> {
        {
            let workers = self.workers.read().await;
            if let Some(handle) = workers.get(&spec.name) {
                if !handle.tx.is_closed() {
                    return handle.tx.clone();
                }
            }
        }

        let mut workers = self.workers.write().await;
        if let Some(handle) = workers.get(&spec.name) {
            if !handle.tx.is_closed() {
                return handle.tx.clone();
            }
        }

        debug!(container = %spec.name, "Spawning worker");
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = ContainerWorker::new(spec.clone(), self.runtime.clone());
        let task = tokio::spawn(worker.run(rx, self.shutdown.child_token()));

        workers.insert(
            spec.name.clone(),
            WorkerHandle {
                tx: tx.clone(),
                task,
            },
        );
        tx
    }

    pub async fn worker_count(&self) -> usize {
        self.workers.read().await.len()
    }

    /// Stops accepting jobs and waits for every worker to finish its current one.
    pub async fn shutdown(&self) -> Vec<WorkerSummary> {
        self.shutdown.cancel();

        let handles: Vec<(String, WorkerHandle)> = self.workers.write().await.drain().collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            drop(handle.tx);
            match handle.task.await {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!(container = %name, error = %e, "Worker task panicked"),
            }
        }
        summaries
    }
}
