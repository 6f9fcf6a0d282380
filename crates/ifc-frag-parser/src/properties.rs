// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property sets and quantities linked through IfcRelDefinesByProperties

use crate::resolver::EntityResolver;
use crate::units::prefix_scale;
use ifc_frag_model::{
    AttributeValue, DecodedEntity, EntityId, IfcType, Property, PropertyReader, PropertySet,
    Quantity, QuantityType, Result,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Reads local properties through a resolver
///
/// Relationships are indexed once up front. Definitions that fail to decode
/// read as absent rather than failing the whole element.
pub struct StepPropertyReader<'r> {
    resolver: &'r dyn EntityResolver,
    psets: FxHashMap<EntityId, Vec<EntityId>>,
    qsets: FxHashMap<EntityId, Vec<EntityId>>,
}

impl<'r> StepPropertyReader<'r> {
    /// Index every IfcRelDefinesByProperties in the file
    pub fn new(resolver: &'r dyn EntityResolver) -> Result<Self> {
        let mut psets: FxHashMap<EntityId, Vec<EntityId>> = FxHashMap::default();
        let mut qsets: FxHashMap<EntityId, Vec<EntityId>> = FxHashMap::default();

        for &rel_id in resolver.ids_by_type(&IfcType::IfcRelDefinesByProperties) {
            let Some(rel) = resolver.get(rel_id)? else {
                continue;
            };
            // RelatedObjects at index 4, RelatingPropertyDefinition at index 5
            let (Some(related), Some(definition_id)) = (rel.get_refs(4), rel.get_ref(5)) else {
                continue;
            };
            let Some(definition) = resolver.get(definition_id)? else {
                continue;
            };

            let target = match definition.ifc_type {
                IfcType::IfcPropertySet => &mut psets,
                IfcType::IfcElementQuantity => &mut qsets,
                _ => continue,
            };
            for object in related {
                target.entry(object).or_default().push(definition_id);
            }
        }

        Ok(Self {
            resolver,
            psets,
            qsets,
        })
    }

    /// Whether the file links any property definition to anything
    pub fn has_definitions(&self) -> bool {
        !self.psets.is_empty() || !self.qsets.is_empty()
    }

    fn fetch(&self, id: EntityId) -> Option<Arc<DecodedEntity>> {
        match self.resolver.get(id) {
            Ok(entity) => entity,
            Err(e) => {
                log::debug!("[Parser] skipping property entity {id}: {e}");
                None
            }
        }
    }

    fn fetch_all(&self, attr: Option<&AttributeValue>) -> Vec<Arc<DecodedEntity>> {
        attr.and_then(AttributeValue::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(AttributeValue::as_entity_ref)
            .filter_map(|id| self.fetch(id))
            .collect()
    }

    fn read_property(&self, prop: &DecodedEntity) -> Option<Property> {
        let name = prop.get_string(0)?.to_string();

        let (value, unit) = match prop.ifc_type {
            IfcType::IfcPropertySingleValue => {
                // NominalValue at index 2, Unit at index 3
                let value = format_value(prop.get(2)?);
                let unit = prop.get_ref(3).and_then(|id| self.unit_symbol(id));
                (value, unit)
            }
            IfcType::IfcPropertyEnumeratedValue | IfcType::IfcPropertyListValue => {
                let values = prop.get_list(2)?;
                (join_values(values), None)
            }
            IfcType::IfcPropertyBoundedValue => {
                // UpperBoundValue at 2, LowerBoundValue at 3
                let upper = prop.get(2).filter(|v| !v.is_null()).map(format_value);
                let lower = prop.get(3).filter(|v| !v.is_null()).map(format_value);
                let value = match (lower, upper) {
                    (Some(l), Some(u)) => format!("{l} - {u}"),
                    (Some(l), None) => format!(">= {l}"),
                    (None, Some(u)) => format!("<= {u}"),
                    (None, None) => return None,
                };
                (value, None)
            }
            _ => return None,
        };

        Some(Property { name, value, unit })
    }

    fn unit_symbol(&self, id: EntityId) -> Option<String> {
        let unit = self.fetch(id)?;
        match unit.ifc_type {
            IfcType::IfcSIUnit => {
                let prefix = match unit.get_enum(2).map(prefix_scale) {
                    Some(s) if s == 1e-3 => "m",
                    Some(s) if s == 1e-2 => "c",
                    Some(s) if s == 1e3 => "k",
                    _ => "",
                };
                let symbol = match unit.get_enum(3)? {
                    "METRE" => "m",
                    "SQUARE_METRE" => "m²",
                    "CUBIC_METRE" => "m³",
                    "GRAM" => "g",
                    "SECOND" => "s",
                    "KELVIN" => "K",
                    "AMPERE" => "A",
                    other => other,
                };
                Some(format!("{prefix}{symbol}"))
            }
            // Name at index 2
            IfcType::IfcConversionBasedUnit => unit.get_string(2).map(str::to_string),
            _ => None,
        }
    }

    fn read_quantity(&self, qty: &DecodedEntity) -> Option<Quantity> {
        let kind = QuantityType::from_ifc_type(&qty.ifc_type)?;
        // Name at 0, value at 3 for every IfcPhysicalSimpleQuantity
        Some(Quantity::new(qty.get_string(0)?, qty.get_float(3)?, kind))
    }
}

impl PropertyReader for StepPropertyReader<'_> {
    fn property_sets(&self, id: EntityId) -> Vec<PropertySet> {
        let Some(ids) = self.psets.get(&id) else {
            return Vec::new();
        };

        ids.iter()
            .filter_map(|&pset_id| self.fetch(pset_id))
            .filter_map(|pset| {
                // Name at 2, HasProperties at 4
                let mut set = PropertySet::new(pset.get_string(2).unwrap_or("Unknown"));
                for prop in self.fetch_all(pset.get(4)) {
                    if let Some(p) = self.read_property(&prop) {
                        set.add(p);
                    }
                }
                (!set.properties.is_empty()).then_some(set)
            })
            .collect()
    }

    fn quantities(&self, id: EntityId) -> Vec<Quantity> {
        let Some(ids) = self.qsets.get(&id) else {
            return Vec::new();
        };

        ids.iter()
            .filter_map(|&qset_id| self.fetch(qset_id))
            // Quantities at index 5
            .flat_map(|qset| self.fetch_all(qset.get(5)))
            .filter_map(|qty| self.read_quantity(&qty))
            .collect()
    }

    fn global_id(&self, id: EntityId) -> Option<String> {
        self.fetch(id)?.get_string(0).map(str::to_string)
    }

    fn name(&self, id: EntityId) -> Option<String> {
        self.fetch(id)?.get_string(2).map(str::to_string)
    }

    fn description(&self, id: EntityId) -> Option<String> {
        self.fetch(id)?.get_string(3).map(str::to_string)
    }

    fn object_type(&self, id: EntityId) -> Option<String> {
        self.fetch(id)?.get_string(4).map(str::to_string)
    }

    fn tag(&self, id: EntityId) -> Option<String> {
        // Tag sits at 7 for IfcElement subtypes
        self.fetch(id)?.get_string(7).map(str::to_string)
    }
}

fn join_values(values: &[AttributeValue]) -> String {
    values.iter().map(format_value).collect::<Vec<_>>().join(", ")
}

/// Render an attribute value for display
pub fn format_value(attr: &AttributeValue) -> String {
    match attr {
        AttributeValue::String(s) | AttributeValue::Enum(s) => s.clone(),
        AttributeValue::Integer(i) => i.to_string(),
        AttributeValue::Float(f) => {
            let s = format!("{f:.6}");
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        AttributeValue::Bool(b) => b.to_string(),
        AttributeValue::TypedValue(_, args) => args.first().map(format_value).unwrap_or_default(),
        AttributeValue::List(items) => join_values(items),
        AttributeValue::Null | AttributeValue::Derived => String::new(),
        AttributeValue::EntityRef(id) => id.to_string(),
    }
}
