use tracing::{debug, info};

use super::events::PackageEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub image: String,
}

/// Decides whether a package event should roll out a new container.
///
/// An event without a tag name is an intermediate push and never deploys.
/// The event's `action` is not consulted, so deletions and updates deploy
/// just like publishes do.
pub fn decide(event: &PackageEvent) -> Option<DeploymentRequest> {
    let tag = event.tag_name();
    let image = event.package_url();

    if tag.is_empty() {
        debug!(action = %event.action(), package_url = %image, "Tag name is empty, skipping");
        return None;
    }

    info!(action = %event.action(), tag = %tag, image = %image, "Deployable package event");
    Some(DeploymentRequest {
        image: image.to_string(),
    })
}
