// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Length unit scale extraction

use crate::resolver::EntityResolver;
use ifc_frag_model::{AttributeValue, DecodedEntity, IfcType, Result};

/// Conversion factor from file length units to meters
///
/// Reads IFCPROJECT.UnitsInContext and returns the first length unit found.
/// Returns 1.0 when the file declares none.
pub fn extract_unit_scale(resolver: &dyn EntityResolver) -> Result<f64> {
    let Some(&project_id) = resolver.ids_by_type(&IfcType::IfcProject).first() else {
        return Ok(1.0);
    };
    let Some(project) = resolver.get(project_id)? else {
        return Ok(1.0);
    };

    // IFCPROJECT has UnitsInContext at index 8
    let Some(assignment) = project
        .get(8)
        .map(|attr| resolver.resolve_ref(attr))
        .transpose()?
        .flatten()
    else {
        return Ok(1.0);
    };

    if let Some(units) = assignment.get(0) {
        for unit in resolver.resolve_ref_list(units)? {
            if let Some(scale) = length_unit_scale(&unit, resolver, 0)? {
                return Ok(scale);
            }
        }
    }

    Ok(1.0)
}

fn length_unit_scale(
    unit: &DecodedEntity,
    resolver: &dyn EntityResolver,
    depth: usize,
) -> Result<Option<f64>> {
    // Conversion units may chain, but never meaningfully this deep
    if depth > 8 {
        return Ok(None);
    }
    match unit.ifc_type {
        IfcType::IfcSIUnit => Ok(si_unit_scale(unit)),
        IfcType::IfcConversionBasedUnit => conversion_unit_scale(unit, resolver, depth),
        _ => Ok(None),
    }
}

/// IFCSIUNIT(*, UnitType, Prefix, Name)
fn si_unit_scale(unit: &DecodedEntity) -> Option<f64> {
    if unit.get_enum(1)? != "LENGTHUNIT" || unit.get_enum(3)? != "METRE" {
        return None;
    }
    Some(unit.get_enum(2).map_or(1.0, prefix_scale))
}

/// SI prefix multiplier, 1.0 for anything unrecognized
pub fn prefix_scale(prefix: &str) -> f64 {
    match prefix {
        "EXA" => 1e18,
        "PETA" => 1e15,
        "TERA" => 1e12,
        "GIGA" => 1e9,
        "MEGA" => 1e6,
        "KILO" => 1e3,
        "HECTO" => 1e2,
        "DECA" => 1e1,
        "DECI" => 1e-1,
        "CENTI" => 1e-2,
        "MILLI" => 1e-3,
        "MICRO" => 1e-6,
        "NANO" => 1e-9,
        "PICO" => 1e-12,
        "FEMTO" => 1e-15,
        "ATTO" => 1e-18,
        _ => 1.0,
    }
}

/// IFCCONVERSIONBASEDUNIT(Dimensions, UnitType, Name, ConversionFactor)
fn conversion_unit_scale(
    unit: &DecodedEntity,
    resolver: &dyn EntityResolver,
    depth: usize,
) -> Result<Option<f64>> {
    if unit.get_enum(1) != Some("LENGTHUNIT") {
        return Ok(None);
    }
    let Some(factor) = unit.get_ref(3).map(|id| resolver.get(id)).transpose()?.flatten() else {
        return Ok(None);
    };
    if factor.ifc_type != IfcType::IfcMeasureWithUnit {
        return Ok(None);
    }

    // IFCMEASUREWITHUNIT(ValueComponent, UnitComponent)
    let Some(value) = factor.get(0).and_then(AttributeValue::as_float) else {
        return Ok(None);
    };
    let base = match factor.get_ref(1).map(|id| resolver.get(id)).transpose()?.flatten() {
        Some(base) => length_unit_scale(&base, resolver, depth + 1)?.unwrap_or(1.0),
        None => 1.0,
    };

    Ok(Some(value * base))
}

/// Common unit scales for reference
pub mod scales {
    /// Meters to meters (identity)
    pub const METRE: f64 = 1.0;
    /// Millimeters to meters
    pub const MILLIMETRE: f64 = 0.001;
    /// Centimeters to meters
    pub const CENTIMETRE: f64 = 0.01;
    /// Inches to meters
    pub const INCH: f64 = 0.0254;
    /// Feet to meters
    pub const FOOT: f64 = 0.3048;
}
