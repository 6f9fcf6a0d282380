// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fragment groups - one loaded model and everything it owns
//!
//! A [`FragmentGroup`] is a cheap, cloneable handle. Disposal drops the data
//! behind every clone at once; afterwards data accessors fail with
//! [`FragmentError::InvalidState`].

use crate::error::{FragmentError, Result};
use ifc_frag_model::{Bounds, LocalProperties, ModelMetadata, ParsedElement, ParsedModel};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier of a fragment group, stable for its lifetime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(Uuid);

impl GroupId {
    /// Fresh random id
    pub fn new() -> Self {
        GroupId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometry and metadata owned by a live group
#[derive(Clone, Debug, Default)]
pub struct GroupData {
    /// Header metadata of the source file
    pub metadata: ModelMetadata,
    /// One fragment per element, sorted by entity id
    pub fragments: Vec<ParsedElement>,
    /// Local properties, `None` when the source carried none
    pub properties: Option<LocalProperties>,
    /// Translation applied by normalization; subtract it to get back to
    /// real-world coordinates
    pub coordination: [f64; 3],
    /// File units to meters of the source file
    pub unit_scale: f64,
}

impl GroupData {
    /// Bounds over every fragment mesh
    pub fn bounds(&self) -> Option<Bounds> {
        self.fragments
            .iter()
            .filter_map(|f| f.mesh.bounds())
            .reduce(|a, b| a.union(&b))
    }

    pub fn triangle_count(&self) -> usize {
        self.fragments.iter().map(|f| f.mesh.triangle_count()).sum()
    }
}

impl From<ParsedModel> for GroupData {
    fn from(model: ParsedModel) -> Self {
        Self {
            metadata: model.metadata,
            fragments: model.elements,
            properties: model.properties,
            coordination: model.coordination,
            unit_scale: model.unit_scale,
        }
    }
}

struct GroupInner {
    id: GroupId,
    name: RwLock<String>,
    data: RwLock<Option<GroupData>>,
}

/// Handle to a loaded model
#[derive(Clone)]
pub struct FragmentGroup {
    inner: Arc<GroupInner>,
}

impl FragmentGroup {
    /// Wrap data in a new group with a fresh id and an empty name
    pub fn new(data: GroupData) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                id: GroupId::new(),
                name: RwLock::new(String::new()),
                data: RwLock::new(Some(data)),
            }),
        }
    }

    pub fn id(&self) -> GroupId {
        self.inner.id
    }

    /// Human-readable label, empty until set
    pub fn name(&self) -> String {
        self.inner.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.inner.name.write() = name.into();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.data.read().is_none()
    }

    /// Run `f` against the group's data
    ///
    /// # Errors
    /// `InvalidState` once the group has been disposed.
    pub fn read<R>(&self, f: impl FnOnce(&GroupData) -> R) -> Result<R> {
        let guard = self.inner.data.read();
        match guard.as_ref() {
            Some(data) => Ok(f(data)),
            None => Err(FragmentError::invalid_state(format!(
                "group {} has been disposed",
                self.inner.id
            ))),
        }
    }

    /// Number of fragments (elements with geometry)
    pub fn element_count(&self) -> Result<usize> {
        self.read(|d| d.fragments.len())
    }

    pub fn bounds(&self) -> Result<Option<Bounds>> {
        self.read(GroupData::bounds)
    }

    pub fn has_properties(&self) -> Result<bool> {
        self.read(|d| d.properties.is_some())
    }

    pub fn coordination(&self) -> Result<[f64; 3]> {
        self.read(|d| d.coordination)
    }

    pub fn metadata(&self) -> Result<ModelMetadata> {
        self.read(|d| d.metadata.clone())
    }

    /// Drop geometry and properties. Returns `false` if already disposed.
    pub(crate) fn release(&self) -> bool {
        self.inner.data.write().take().is_some()
    }
}

impl PartialEq for FragmentGroup {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for FragmentGroup {}

impl fmt::Debug for FragmentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentGroup")
            .field("id", &self.inner.id)
            .field("name", &*self.inner.name.read())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
