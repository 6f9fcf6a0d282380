// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property and quantity records attached to fragment elements

use crate::{EntityId, IfcType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single property value with optional unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Property value as formatted string
    pub value: String,
    /// Unit of measurement (if applicable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Property {
    /// Create a new property
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit: None,
        }
    }

    /// Create a property with unit
    pub fn with_unit(
        name: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit: Some(unit.into()),
        }
    }
}

/// A property set containing multiple properties
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    /// Property set name (e.g., "Pset_WallCommon")
    pub name: String,
    /// Properties in this set
    pub properties: Vec<Property>,
}

impl PropertySet {
    /// Create a new property set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Add a property to this set
    pub fn add(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Get a property by name
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Quantity types supported in IFC
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantityType {
    /// Linear measurement (IfcQuantityLength)
    Length,
    /// Area measurement (IfcQuantityArea)
    Area,
    /// Volume measurement (IfcQuantityVolume)
    Volume,
    /// Count (IfcQuantityCount)
    Count,
    /// Weight/mass measurement (IfcQuantityWeight)
    Weight,
    /// Time measurement (IfcQuantityTime)
    Time,
}

impl QuantityType {
    /// Map an IfcQuantity* entity type to its quantity kind
    pub fn from_ifc_type(ifc_type: &IfcType) -> Option<Self> {
        match ifc_type {
            IfcType::IfcQuantityLength => Some(QuantityType::Length),
            IfcType::IfcQuantityArea => Some(QuantityType::Area),
            IfcType::IfcQuantityVolume => Some(QuantityType::Volume),
            IfcType::IfcQuantityCount => Some(QuantityType::Count),
            IfcType::IfcQuantityWeight => Some(QuantityType::Weight),
            IfcType::IfcQuantityTime => Some(QuantityType::Time),
            _ => None,
        }
    }

    /// Get default unit for this quantity type
    pub fn default_unit(&self) -> &'static str {
        match self {
            QuantityType::Length => "m",
            QuantityType::Area => "m²",
            QuantityType::Volume => "m³",
            QuantityType::Count => "",
            QuantityType::Weight => "kg",
            QuantityType::Time => "s",
        }
    }
}

/// A quantity value with type and unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Quantity name
    pub name: String,
    /// Numeric value
    pub value: f64,
    /// Unit of measurement
    pub unit: String,
    /// Type of quantity
    pub quantity_type: QuantityType,
}

impl Quantity {
    /// Create a new quantity
    pub fn new(name: impl Into<String>, value: f64, quantity_type: QuantityType) -> Self {
        Self {
            name: name.into(),
            value,
            unit: quantity_type.default_unit().to_string(),
            quantity_type,
        }
    }

    /// Format the value with unit
    pub fn formatted(&self) -> String {
        if self.unit.is_empty() {
            format!("{}", self.value)
        } else {
            format!("{} {}", self.value, self.unit)
        }
    }
}

/// Property and quantity reader trait
///
/// Provides access to property sets and quantities associated with IFC entities.
/// Property sets come from IfcPropertySet entities linked via IfcRelDefinesByProperties.
/// Quantities come from IfcElementQuantity entities.
pub trait PropertyReader: Send + Sync {
    /// Get all property sets associated with an entity
    fn property_sets(&self, id: EntityId) -> Vec<PropertySet>;

    /// Get all quantities associated with an entity
    fn quantities(&self, id: EntityId) -> Vec<Quantity>;

    /// Get a specific property by name
    ///
    /// Searches all property sets for the entity and returns the first
    /// property with the matching name.
    fn get_property(&self, id: EntityId, name: &str) -> Option<Property> {
        self.property_sets(id)
            .into_iter()
            .flat_map(|pset| pset.properties)
            .find(|p| p.name == name)
    }

    /// Get entity's GlobalId (GUID)
    fn global_id(&self, id: EntityId) -> Option<String>;

    /// Get entity's Name attribute
    fn name(&self, id: EntityId) -> Option<String>;

    /// Get entity's Description attribute
    fn description(&self, id: EntityId) -> Option<String>;

    /// Get entity's ObjectType attribute
    fn object_type(&self, _id: EntityId) -> Option<String> {
        None
    }

    /// Get entity's Tag attribute
    fn tag(&self, _id: EntityId) -> Option<String> {
        None
    }
}

/// Local properties of a single element: its own attributes plus every
/// property set and quantity attached to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementProperties {
    pub id: EntityId,
    pub category: IfcType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub property_sets: Vec<PropertySet>,
    #[serde(default)]
    pub quantities: Vec<Quantity>,
}

impl ElementProperties {
    /// Record with only identity filled in
    pub fn new(id: EntityId, category: IfcType) -> Self {
        Self {
            id,
            category,
            global_id: None,
            name: None,
            description: None,
            object_type: None,
            tag: None,
            property_sets: Vec::new(),
            quantities: Vec::new(),
        }
    }

    /// Gather everything `reader` knows about `id`
    pub fn from_reader(reader: &dyn PropertyReader, id: EntityId, category: IfcType) -> Self {
        Self {
            id,
            category,
            global_id: reader.global_id(id),
            name: reader.name(id),
            description: reader.description(id),
            object_type: reader.object_type(id),
            tag: reader.tag(id),
            property_sets: reader.property_sets(id),
            quantities: reader.quantities(id),
        }
    }

    /// Find a property by name across all sets
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.property_sets.iter().find_map(|pset| pset.get(name))
    }
}

/// Local properties of a whole group keyed by element id.
///
/// Ordered so that serialized sidecars are stable.
pub type LocalProperties = BTreeMap<u32, ElementProperties>;
