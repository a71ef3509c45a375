/// Frame registry - the engine's single source of truth for live frames
///
/// Every registered frame carries a [`FrameStatus`]. The frame "sets" the
/// engine reasons about are views over the registry:
/// - active: status `Active` (still producing)
/// - total: every registered frame, so always a superset of active
///
/// Removal ends the frame's life; stale [`FrameId`]s fail lookup through the
/// slot map generation.

use slotmap::{new_key_type, SlotMap};
use super::presentation_frame::PresentationFrame;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable identity of a frame within the engine
    pub struct FrameId;
}

/// Position of a registered frame in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Producing: holds the frame slot
    Active,
    /// Rendered, slot released early, waiting for presentation
    Rendered,
    /// Presented, waiting for queue completion
    Presented,
}

struct FrameEntry {
    frame: PresentationFrame,
    status: FrameStatus,
}

#[derive(Default)]
pub struct FrameRegistry {
    frames: SlotMap<FrameId, FrameEntry>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self { frames: SlotMap::with_key() }
    }

    /// Register a new frame as active
    pub fn insert(&mut self, frame: PresentationFrame) -> FrameId {
        self.frames.insert(FrameEntry { frame, status: FrameStatus::Active })
    }

    /// Remove a frame; its id becomes stale
    pub fn remove(&mut self, id: FrameId) -> Option<PresentationFrame> {
        self.frames.remove(id).map(|entry| entry.frame)
    }

    pub fn contains(&self, id: FrameId) -> bool {
        self.frames.contains_key(id)
    }

    pub fn get(&self, id: FrameId) -> Option<&PresentationFrame> {
        self.frames.get(id).map(|entry| &entry.frame)
    }

    pub fn get_mut(&mut self, id: FrameId) -> Option<&mut PresentationFrame> {
        self.frames.get_mut(id).map(|entry| &mut entry.frame)
    }

    pub fn status(&self, id: FrameId) -> Option<FrameStatus> {
        self.frames.get(id).map(|entry| entry.status)
    }

    /// Move a frame to another status; returns false for stale ids
    pub fn set_status(&mut self, id: FrameId, status: FrameStatus) -> bool {
        match self.frames.get_mut(id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: FrameId) -> bool {
        self.status(id) == Some(FrameStatus::Active)
    }

    /// Number of active frames
    pub fn active_count(&self) -> usize {
        self.frames.values().filter(|entry| entry.status == FrameStatus::Active).count()
    }

    /// Number of registered frames
    pub fn total_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn active_ids(&self) -> Vec<FrameId> {
        self.frames
            .iter()
            .filter(|(_, entry)| entry.status == FrameStatus::Active)
            .map(|(id, _)| id)
            .collect()
    }

    /// Every registered frame id, ordered by frame order
    pub fn ids(&self) -> Vec<FrameId> {
        let mut ids: Vec<(u64, FrameId)> = self
            .frames
            .iter()
            .map(|(id, entry)| (entry.frame.order(), id))
            .collect();
        ids.sort_unstable_by_key(|(order, _)| *order);
        ids.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
