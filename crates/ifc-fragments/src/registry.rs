// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The set of loaded groups

use crate::error::{FragmentError, Result};
use crate::group::{FragmentGroup, GroupId};
use rustc_hash::FxHashMap;

/// Source of truth for which models exist
///
/// Every group reachable from the registry is live: disposal removes the entry
/// before releasing memory, and disposed groups cannot be registered.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: FxHashMap<GroupId, FragmentGroup>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a group
    ///
    /// # Errors
    /// `DuplicateId` if a group with the same id is registered,
    /// `InvalidState` if the group was already disposed.
    pub fn register(&mut self, group: FragmentGroup) -> Result<()> {
        let id = group.id();
        if self.groups.contains_key(&id) {
            return Err(FragmentError::DuplicateId(id));
        }
        if group.is_disposed() {
            return Err(FragmentError::invalid_state(format!(
                "cannot register disposed group {id}"
            )));
        }
        self.groups.insert(id, group);
        log::debug!("[Registry] registered {id} ({} groups)", self.groups.len());
        Ok(())
    }

    pub fn get(&self, id: GroupId) -> Option<FragmentGroup> {
        self.groups.get(&id).cloned()
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.groups.contains_key(&id)
    }

    /// Snapshot of every registered group, unaffected by later mutation
    pub fn all(&self) -> Vec<FragmentGroup> {
        self.groups.values().cloned().collect()
    }

    /// Stop tracking a group without disposing it
    pub fn remove(&mut self, id: GroupId) -> Option<FragmentGroup> {
        let removed = self.groups.remove(&id);
        if removed.is_some() {
            log::debug!("[Registry] removed {id}");
        }
        removed
    }

    /// Remove and return every group
    pub(crate) fn drain(&mut self) -> Vec<FragmentGroup> {
        self.groups.drain().map(|(_, group)| group).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
