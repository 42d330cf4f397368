//! Reference-counted resource registry
//!
//! Shared table of loaded resources keyed by content identifier.

mod resource_handle;
mod resource_registry;

pub use resource_handle::{ResourceHandle, Payload, Destructor};
pub use resource_registry::{ResourceRegistry, RegistryStats};
