// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loader settings - which categories to drop and how to place the result
//!
//! A parser receives a shared reference to the settings for the whole of one
//! parse, so the policy cannot change mid-load. Callers clone or mutate it
//! freely between loads.

use crate::IfcType;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Category filter policy applied while converting a model into fragments
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Element categories omitted entirely from geometry and properties
    pub excluded_categories: FxHashSet<IfcType>,
    /// Translate geometry so the model's bounding-box center sits at the origin
    pub normalize_coordinates: bool,
    /// Retain local properties (attributes, property sets, quantities)
    pub include_properties: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            excluded_categories: FxHashSet::default(),
            normalize_coordinates: true,
            include_properties: true,
        }
    }
}

impl LoaderSettings {
    /// Structural reinforcement categories, usually too dense to be worth loading
    pub const REINFORCEMENT: [IfcType; 5] = [
        IfcType::IfcTendonAnchor,
        IfcType::IfcReinforcingBar,
        IfcType::IfcReinforcingElement,
        IfcType::IfcReinforcingMesh,
        IfcType::IfcTendon,
    ];

    /// Create settings with nothing excluded and normalization enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category to the exclusion set.
    ///
    /// Returns `true` if the category was not excluded before.
    pub fn exclude(&mut self, category: IfcType) -> bool {
        self.excluded_categories.insert(category)
    }

    /// Remove a category from the exclusion set.
    ///
    /// Returns `true` if the category was excluded before.
    pub fn include(&mut self, category: &IfcType) -> bool {
        self.excluded_categories.remove(category)
    }

    /// Whether elements of `category` are dropped during loading
    pub fn is_excluded(&self, category: &IfcType) -> bool {
        self.excluded_categories.contains(category)
    }

    /// Toggle bounding-box recentering
    pub fn set_normalize_coordinates(&mut self, enabled: bool) {
        self.normalize_coordinates = enabled;
    }

    /// Toggle retention of local properties
    pub fn set_include_properties(&mut self, enabled: bool) {
        self.include_properties = enabled;
    }

    /// Builder: exclude a category
    pub fn excluding(mut self, category: IfcType) -> Self {
        self.exclude(category);
        self
    }

    /// Builder: exclude every reinforcement category
    pub fn excluding_reinforcement(mut self) -> Self {
        self.excluded_categories
            .extend(Self::REINFORCEMENT.iter().cloned());
        self
    }

    /// Builder: set coordinate normalization
    pub fn with_normalize_coordinates(mut self, enabled: bool) -> Self {
        self.normalize_coordinates = enabled;
        self
    }

    /// Builder: set property retention
    pub fn with_properties(mut self, enabled: bool) -> Self {
        self.include_properties = enabled;
        self
    }

    /// Excluded categories sorted by STEP name, for stable display
    pub fn excluded_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.excluded_categories.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names
    }
}
