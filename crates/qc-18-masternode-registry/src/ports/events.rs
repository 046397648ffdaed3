//! # Registry Events (Driving the consumers)
//!
//! Subsystems that mirror the registry (simplified lists, quorum sessions)
//! are told about every change together with the list it applies to.

use crate::domain::{Registry, RegistryDelta};

pub trait RegistryListener: Send + Sync {
    /// `delta` turns `base` into the new tip list. `undo` is set when the
    /// change comes from disconnecting a block.
    fn registry_updated(&self, undo: bool, base: &Registry, delta: &RegistryDelta);
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl RegistryListener for NoopListener {
    fn registry_updated(&self, _undo: bool, _base: &Registry, _delta: &RegistryDelta) {}
}
