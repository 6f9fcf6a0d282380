// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Memory reclamation for registered groups
//!
//! Entries leave the registry before their memory is released, so nothing
//! reachable from the registry is ever a dead group.

use crate::error::{FragmentError, Result};
use crate::group::{FragmentGroup, GroupId};
use crate::registry::GroupRegistry;

/// Dispose every registered group. Returns the ids that were released.
///
/// A no-op on an empty registry.
pub fn dispose_all(registry: &mut GroupRegistry) -> Vec<GroupId> {
    let groups = registry.drain();
    let ids: Vec<GroupId> = groups.iter().filter(|g| release(g)).map(FragmentGroup::id).collect();
    if !ids.is_empty() {
        log::info!("[Disposer] disposed {} groups", ids.len());
    }
    ids
}

/// Dispose a single registered group
///
/// # Errors
/// `NotFound` if no group with this id is registered.
pub fn dispose_one(registry: &mut GroupRegistry, id: GroupId) -> Result<()> {
    let group = registry.remove(id).ok_or(FragmentError::NotFound(id))?;
    release(&group);
    Ok(())
}

fn release(group: &FragmentGroup) -> bool {
    let triangles = group.read(|d| d.triangle_count()).unwrap_or(0);
    let released = group.release();
    if released {
        log::debug!("[Disposer] released {} ({triangles} triangles)", group.id());
    }
    released
}
