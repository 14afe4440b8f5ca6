//! HTTP front door.
//!
//! # Endpoints
//!
//! - `GET /` - liveness check, answers `Root requested`
//! - `POST /event_handler` - GitHub webhook deliveries
//!
//! The signature is checked before the body is looked at. A bad signature
//! yields `403 Forbidden.`; everything else, including ignored events and
//! undecodable payloads, yields `200 OK`. Redeploys are queued and the
//! response goes out without waiting for them.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::worker::Dispatcher;
use crate::tasks::ContainerSpec;
use crate::webhook::{AuthError, EventAction, classify, decide, verify};

/// Header carrying the event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header carrying the `sha256=` signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";
/// GitHub caps webhook payloads at 25 MB.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Shared, immutable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    webhook_secret: SecretString,
    container: ContainerSpec,
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(
        webhook_secret: SecretString,
        container: ContainerSpec,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                webhook_secret,
                container,
                dispatcher,
            }),
        }
    }

    pub fn container(&self) -> &ContainerSpec {
        &self.inner.container
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    fn secret(&self) -> &[u8] {
        self.inner.webhook_secret.expose_secret().as_bytes()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/event_handler", post(event_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

pub async fn root_handler() -> (StatusCode, &'static str) {
    debug!("Root requested");
    (StatusCode::OK, "Root requested\n")
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn event_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    info!(bytes = body.len(), "Received webhook");

    let verified = match header(&headers, HEADER_SIGNATURE) {
        Some(signature) => verify(&body, signature, state.secret()),
        None => Err(AuthError::MissingSignature),
    };
    if let Err(e) = verified {
        warn!(error = %e, "Rejecting webhook");
        return (StatusCode::FORBIDDEN, "Forbidden.");
    }

    let event_type = header(&headers, HEADER_EVENT).unwrap_or_default();
    match classify(event_type, &body) {
        Ok(EventAction::Ping) => info!("Ping received"),
        Ok(EventAction::Ignore(kind)) => info!(event_type = %kind, "Ignoring event"),
        Ok(EventAction::Package(event)) => {
            if let Some(request) = decide(&event) {
                match state
                    .dispatcher()
                    .submit(state.container(), request.image)
                    .await
                {
                    Ok(id) => info!(deployment_id = %id, "Redeploy scheduled"),
                    Err(e) => error!(error = %e, "Could not schedule redeploy"),
                }
            }
        }
        Err(e) => warn!(error = %e, "Dropping package event"),
    }

    (StatusCode::OK, "OK")
}

/// Binds the listener and serves until `shutdown` resolves.
pub struct WebhookServer {
    pub address: SocketAddr,
    pub state: AppState,
}

impl WebhookServer {
    pub fn new(address: SocketAddr, state: AppState) -> Self {
        WebhookServer { address, state }
    }

    pub async fn start_server<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.address).await?;
        info!(address = %listener.local_addr()?, "Listening for webhooks");

        axum::serve(listener, build_router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
    }
}
