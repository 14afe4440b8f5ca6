use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ci_update_server::{
    config::{Config, LogFormat, RuntimeKind},
    tasks::{ContainerRuntime, DockerCli, DockerEngine},
    worker::{AppState, Dispatcher, WebhookServer},
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ci_update_server=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    let container = config.container();
    info!(
        listen = %config.listen,
        container = %container.name,
        publish = %container.ports,
        runtime = ?config.runtime,
        "Starting ci-update-server"
    );

    let runtime: Arc<dyn ContainerRuntime> = match config.runtime {
        RuntimeKind::Cli => Arc::new(DockerCli::new(
            config.docker_bin.clone(),
            config.command_timeout(),
        )),
        RuntimeKind::Engine => Arc::new(
            DockerEngine::connect(config.command_timeout())
                .context("could not set up the Docker engine client")?,
        ),
    };

    let dispatcher = Arc::new(Dispatcher::new(runtime));
    let state = AppState::new(config.webhook_secret(), container, dispatcher.clone());

    WebhookServer::new(config.listen, state)
        .start_server(shutdown_signal())
        .await
        .with_context(|| format!("server on {} failed", config.listen))?;

    let dropped: u64 = dispatcher
        .shutdown()
        .await
        .iter()
        .map(|summary| summary.dropped)
        .sum();
    info!(dropped, "Server closed");
    Ok(())
}
