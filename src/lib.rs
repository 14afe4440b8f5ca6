//! Continuous-deployment trigger for a single managed container.
//!
//! A GitHub `package` webhook announces a freshly published image; once the
//! request signature checks out the managed container is pulled, stopped,
//! removed and started again from the new image.

pub mod config;
pub mod tasks;
pub mod webhook;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_utils;
