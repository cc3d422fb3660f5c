//! Touchpoints available to provisio
//!
//! The registry carries every touchpoint plus its actions under qualified
//! names (`native.mkdir`), so instructions of units bound to another
//! touchpoint can still call them.

pub mod native;

use provisioning::{Touchpoint, TouchpointRegistry};
use std::path::PathBuf;
use std::sync::Arc;

pub use native::NativeTouchpoint;

/// Build the registry with all built-in touchpoints
pub fn registry(backup_root: PathBuf) -> TouchpointRegistry {
    let native = NativeTouchpoint::new(backup_root);
    let mut registry = TouchpointRegistry::new();

    for name in native::ACTIONS {
        if let Some(action) = native.action(name) {
            registry.register_action(format!("{}.{name}", native::TOUCHPOINT_ID), action);
        }
    }
    registry.register_touchpoint(Arc::new(native));
    registry
}
