//! Child-list mutation delivery
//!
//! Hosts report child-list changes of item-list containers as
//! [`MutationRecord`]s. A [`MutationWatcher`] bound to one container forwards
//! matching records to a [`MutationHandler`] while it is observing; records
//! arriving while paused are dropped, like a disconnected observer.

use crate::types::{ItemId, ListId};

/// One batch of child-list changes on a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: ListId,
    /// Inserted items (hosts resolve inserted subtrees to the items inside them)
    pub added: Vec<ItemId>,
    pub removed: Vec<ItemId>,
}

impl MutationRecord {
    pub fn added(target: ListId, added: Vec<ItemId>) -> Self {
        Self { target, added, removed: Vec::new() }
    }

    pub fn removed(target: ListId, removed: Vec<ItemId>) -> Self {
        Self { target, added: Vec::new(), removed }
    }
}

pub trait MutationHandler {
    fn on_nodes_added(&mut self, target: ListId, nodes: &[ItemId]);

    fn on_nodes_removed(&mut self, _target: ListId, _nodes: &[ItemId]) {}
}

#[derive(Debug, Clone, Default)]
pub struct MutationWatcher {
    target: Option<ListId>,
    observing: bool,
}

impl MutationWatcher {
    pub fn create() -> Self {
        Self::default()
    }

    /// Bind to `target` and start observing.
    pub fn observe(mut self, target: ListId) -> Self {
        self.target = Some(target);
        self.observing = true;
        self
    }

    pub fn target(&self) -> Option<ListId> {
        self.target
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn pause(&mut self) {
        self.observing = false;
    }

    pub fn resume(&mut self) {
        if self.target.is_some() {
            self.observing = true;
        }
    }

    /// Forward `record` if it targets the watched container.
    pub fn deliver(&self, record: &MutationRecord, handler: &mut dyn MutationHandler) -> bool {
        if !self.observing || self.target != Some(record.target) {
            return false;
        }
        if !record.added.is_empty() {
            handler.on_nodes_added(record.target, &record.added);
        }
        if !record.removed.is_empty() {
            handler.on_nodes_removed(record.target, &record.removed);
        }
        true
    }
}
