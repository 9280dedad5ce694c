//! Shared Context
//!
//! Per-request blackboard passing artifacts between plan steps. Each slot is
//! typed: a write is rejected when the slot does not accept the artifact's
//! kind. Reads of never-written slots are the executor's precondition check.

use sdk::{Artifact, ArtifactKind, ContextSlot};
use std::collections::HashMap;

/// Rejected slot write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMismatch {
    pub slot: ContextSlot,
    pub found: ArtifactKind,
}

#[derive(Debug, Default)]
pub struct SharedContext {
    slots: HashMap<ContextSlot, Artifact>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an artifact, replacing whatever the slot held.
    pub fn write(&mut self, slot: ContextSlot, artifact: Artifact) -> Result<(), SlotMismatch> {
        let kind = artifact.kind();
        if !slot.accepts(kind) {
            return Err(SlotMismatch { slot, found: kind });
        }
        self.slots.insert(slot, artifact);
        Ok(())
    }

    pub fn read(&self, slot: ContextSlot) -> Option<&Artifact> {
        self.slots.get(&slot)
    }

    pub fn is_populated(&self, slot: ContextSlot) -> bool {
        self.slots.contains_key(&slot)
    }

    /// First slot of `required` that has never been written
    pub fn first_missing(&self, required: &[ContextSlot]) -> Option<ContextSlot> {
        required.iter().copied().find(|slot| !self.is_populated(*slot))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
