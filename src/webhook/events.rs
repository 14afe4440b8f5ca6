//! Event classification and the `package` payload model.
//!
//! Only the fields the deploy decision needs are modelled. Every nested
//! object is optional so that partially populated publishes (untagged layer
//! pushes, for instance) still decode; emptiness is judged later by
//! [`crate::webhook::policy::decide`].

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[error("malformed package event: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageEvent {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub package: Option<Package>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub package_version: Option<PackageVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageVersion {
    #[serde(default)]
    pub package_url: Option<String>,
    #[serde(default)]
    pub container_metadata: Option<ContainerMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerMetadata {
    #[serde(default)]
    pub tag: Option<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub name: Option<String>,
}

impl PackageEvent {
    pub fn action(&self) -> &str {
        self.action.as_deref().unwrap_or_default()
    }

    fn version(&self) -> Option<&PackageVersion> {
        self.package.as_ref()?.package_version.as_ref()
    }

    /// Fully-qualified image reference, empty when absent.
    pub fn package_url(&self) -> &str {
        self.version()
            .and_then(|v| v.package_url.as_deref())
            .unwrap_or_default()
    }

    /// Published tag, empty when absent.
    pub fn tag_name(&self) -> &str {
        self.version()
            .and_then(|v| v.container_metadata.as_ref())
            .and_then(|m| m.tag.as_ref())
            .and_then(|t| t.name.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    /// Event type we do not handle; carries the lower-cased type name.
    Ignore(String),
    Ping,
    Package(PackageEvent),
}

/// Maps an `X-GitHub-Event` value and body to what should happen next.
///
/// Event types compare case-insensitively. Only `package` bodies are decoded.
pub fn classify(event_type: &str, body: &[u8]) -> Result<EventAction, DecodeError> {
    let event_type = event_type.trim().to_ascii_lowercase();
    match event_type.as_str() {
        "ping" => Ok(EventAction::Ping),
        "package" => {
            let event: PackageEvent = serde_json::from_slice(body)?;
            Ok(EventAction::Package(event))
        }
        _ => {
            debug!(event_type = %event_type, "Unhandled event type");
            Ok(EventAction::Ignore(event_type))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_payload() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "action": "published",
            "package": {
                "name": "app",
                "package_version": {
                    "package_url": "ghcr.io/owner/app:v1.2.3",
                    "container_metadata": {
                        "tag": { "name": "v1.2.3", "digest": "sha256:abc" }
                    }
                }
            },
            "sender": { "login": "octocat" }
        }))
        .unwrap()
    }

    #[test]
    fn ping_ignores_body() {
        assert_eq!(classify("ping", b"{not json").unwrap(), EventAction::Ping);
        assert_eq!(classify("ping", b"").unwrap(), EventAction::Ping);
    }

    #[test]
    fn package_is_case_insensitive() {
        let EventAction::Package(event) = classify("PACKAGE", &full_payload()).unwrap() else {
            panic!("expected package event");
        };
        assert_eq!(event.action(), "published");
        assert_eq!(event.package_url(), "ghcr.io/owner/app:v1.2.3");
        assert_eq!(event.tag_name(), "v1.2.3");
    }

    #[test]
    fn malformed_package_body_is_decode_error() {
        assert!(classify("package", b"{not json").is_err());
        assert!(classify("package", b"").is_err());
        assert!(classify("package", b"null").is_err());
        assert!(classify("package", b"42").is_err());
    }

    #[test]
    fn wrong_field_type_is_decode_error() {
        let body = br#"{"package": {"package_version": {"package_url": 42}}}"#;
        assert!(classify("package", body).is_err());
    }

    #[test]
    fn unknown_event_is_ignored() {
        assert_eq!(
            classify("Push", b"{}").unwrap(),
            EventAction::Ignore("push".to_string())
        );
        assert_eq!(classify("", b"").unwrap(), EventAction::Ignore(String::new()));
    }

    #[test]
    fn missing_nested_fields_decode_as_empty() {
        let EventAction::Package(event) = classify("package", b"{}").unwrap() else {
            panic!("expected package event");
        };
        assert_eq!(event.action(), "");
        assert_eq!(event.package_url(), "");
        assert_eq!(event.tag_name(), "");

        let body = br#"{"action": "published", "package": {"package_version": {"package_url": "ghcr.io/o/a", "container_metadata": {"tag": null}}}}"#;
        let EventAction::Package(event) = classify("package", body).unwrap() else {
            panic!("expected package event");
        };
        assert_eq!(event.package_url(), "ghcr.io/o/a");
        assert_eq!(event.tag_name(), "");
    }
}
