//! Webhook core: authenticate the delivery, classify it, decide whether it
//! deploys anything.

pub mod events;
pub mod policy;
pub mod signature;

pub use events::{DecodeError, EventAction, PackageEvent, classify};
pub use policy::{DeploymentRequest, decide};
pub use signature::{AuthError, sign, verify};
