//! Owned tool instances keyed by id.

use std::collections::HashMap;
use std::rc::Rc;

use crate::contract::SharedTool;

/// Lazily filled store of tool instances.
#[derive(Default)]
pub(super) struct InstanceCache {
    instances: HashMap<String, SharedTool>,
}

impl InstanceCache {
    pub(super) fn get(&self, id: &str) -> Option<SharedTool> {
        self.instances.get(id).map(Rc::clone)
    }

    pub(super) fn insert(&mut self, id: &str, tool: &SharedTool) {
        self.instances.insert(id.to_owned(), Rc::clone(tool));
    }

    pub(super) fn remove(&mut self, id: &str) -> Option<SharedTool> {
        self.instances.remove(id)
    }

    /// Removes every instance, sorted by id so shutdown order is stable.
    pub(super) fn drain(&mut self) -> Vec<(String, SharedTool)> {
        let mut drained: Vec<_> = self.instances.drain().collect();
        drained.sort_by(|left, right| left.0.cmp(&right.0));
        drained
    }

    pub(super) fn len(&self) -> usize {
        self.instances.len()
    }
}
