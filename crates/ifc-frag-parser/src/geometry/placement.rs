// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Points, directions and placements
//!
//! Every transform here is in file units; scaling to meters happens once per
//! element after placement.

use super::error::{Error, Result};
use super::{Matrix3, Matrix4, Point2, Point3, Vector3};
use crate::resolver::EntityResolver;
use ifc_frag_model::{AttributeValue, DecodedEntity, EntityId, IfcType};
use std::sync::Arc;

/// Placement chains deeper than this are treated as cyclic
const MAX_PLACEMENT_DEPTH: usize = 64;

/// Decode a referenced entity, failing if it does not exist
pub fn fetch(resolver: &dyn EntityResolver, id: EntityId) -> Result<Arc<DecodedEntity>> {
    resolver.get(id)?.ok_or(Error::EntityNotFound(id))
}

/// Follow an optional reference attribute
pub fn fetch_attr(
    resolver: &dyn EntityResolver,
    entity: &DecodedEntity,
    index: usize,
) -> Result<Option<Arc<DecodedEntity>>> {
    entity.get_ref(index).map(|id| fetch(resolver, id)).transpose()
}

/// Numeric list attribute such as Coordinates or DirectionRatios
pub fn floats(attr: Option<&AttributeValue>) -> Vec<f64> {
    attr.and_then(AttributeValue::as_list)
        .map(|list| list.iter().filter_map(AttributeValue::as_float).collect())
        .unwrap_or_default()
}

/// IfcCartesianPoint, 2D points land on z = 0
pub fn point3(point: &DecodedEntity) -> Result<Point3<f64>> {
    match floats(point.get(0)).as_slice() {
        [x, y] => Ok(Point3::new(*x, *y, 0.0)),
        [x, y, z, ..] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(Error::invalid_attribute(0, format!("bad coordinates on {}", point.id))),
    }
}

pub fn point2(point: &DecodedEntity) -> Result<Point2<f64>> {
    let p = point3(point)?;
    Ok(Point2::new(p.x, p.y))
}

/// IfcDirection as a unit vector, `None` for a zero vector
pub fn direction3(direction: &DecodedEntity) -> Option<Vector3<f64>> {
    let ratios = floats(direction.get(0));
    let v = match ratios.as_slice() {
        [x, y] => Vector3::new(*x, *y, 0.0),
        [x, y, z, ..] => Vector3::new(*x, *y, *z),
        _ => return None,
    };
    v.try_normalize(1e-12)
}

fn optional_direction(
    resolver: &dyn EntityResolver,
    entity: &DecodedEntity,
    index: usize,
) -> Result<Option<Vector3<f64>>> {
    Ok(fetch_attr(resolver, entity, index)?.and_then(|d| direction3(&d)))
}

/// Right-handed frame from a main axis and an approximate X direction
fn frame(z: Vector3<f64>, x_hint: Option<Vector3<f64>>) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let fallback = if z.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    let x = x_hint
        .and_then(|hint| (hint - z * hint.dot(&z)).try_normalize(1e-9))
        .or_else(|| (fallback - z * fallback.dot(&z)).try_normalize(1e-9))
        .unwrap_or_else(Vector3::x);
    let y = z.cross(&x);
    (x, y, z)
}

fn compose(x: Vector3<f64>, y: Vector3<f64>, z: Vector3<f64>, origin: Point3<f64>) -> Matrix4<f64> {
    Matrix4::new(
        x.x, y.x, z.x, origin.x, //
        x.y, y.y, z.y, origin.y, //
        x.z, y.z, z.z, origin.z, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// IfcAxis2Placement3D(Location, Axis, RefDirection)
pub fn axis2_placement_3d(
    resolver: &dyn EntityResolver,
    placement: &DecodedEntity,
) -> Result<Matrix4<f64>> {
    let origin = match fetch_attr(resolver, placement, 0)? {
        Some(p) => point3(&p)?,
        None => Point3::origin(),
    };
    let z = optional_direction(resolver, placement, 1)?.unwrap_or_else(Vector3::z);
    let x_hint = optional_direction(resolver, placement, 2)?;
    let (x, y, z) = frame(z, x_hint);
    Ok(compose(x, y, z, origin))
}

/// IfcAxis2Placement2D(Location, RefDirection) as a homogeneous 2D transform
pub fn axis2_placement_2d(
    resolver: &dyn EntityResolver,
    placement: &DecodedEntity,
) -> Result<Matrix3<f64>> {
    let origin = match fetch_attr(resolver, placement, 0)? {
        Some(p) => point2(&p)?,
        None => Point2::origin(),
    };
    let x = optional_direction(resolver, placement, 1)?
        .and_then(|d| Vector3::new(d.x, d.y, 0.0).try_normalize(1e-12))
        .unwrap_or_else(Vector3::x);

    Ok(Matrix3::new(
        x.x, -x.y, origin.x, //
        x.y, x.x, origin.y, //
        0.0, 0.0, 1.0,
    ))
}

/// Any placement entity that can appear as an item Position
pub fn placement_matrix(
    resolver: &dyn EntityResolver,
    placement: &DecodedEntity,
) -> Result<Matrix4<f64>> {
    match placement.ifc_type {
        IfcType::IfcAxis2Placement3D => axis2_placement_3d(resolver, placement),
        IfcType::IfcAxis2Placement2D => {
            let m = axis2_placement_2d(resolver, placement)?;
            Ok(Matrix4::new(
                m[(0, 0)], m[(0, 1)], 0.0, m[(0, 2)], //
                m[(1, 0)], m[(1, 1)], 0.0, m[(1, 2)], //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ))
        }
        IfcType::IfcLocalPlacement => local_placement(resolver, placement.id),
        ref other => Err(Error::unsupported_type(other.name())),
    }
}

/// World transform of an IfcLocalPlacement, following PlacementRelTo upwards
pub fn local_placement(resolver: &dyn EntityResolver, id: EntityId) -> Result<Matrix4<f64>> {
    let mut chain = Vec::new();
    let mut next = Some(id);

    while let Some(current) = next {
        if chain.len() >= MAX_PLACEMENT_DEPTH {
            return Err(Error::placement(format!("placement chain from {id} does not terminate")));
        }
        let placement = fetch(resolver, current)?;
        if placement.ifc_type != IfcType::IfcLocalPlacement {
            return Err(Error::placement(format!(
                "{current} is {}, not a local placement",
                placement.ifc_type
            )));
        }

        // PlacementRelTo at 0, RelativePlacement at 1
        let relative = match fetch_attr(resolver, &placement, 1)? {
            Some(rel) => placement_matrix(resolver, &rel)?,
            None => Matrix4::identity(),
        };
        chain.push(relative);
        next = placement.get_ref(0);
    }

    Ok(chain
        .into_iter()
        .rev()
        .fold(Matrix4::identity(), |world, local| world * local))
}

/// IfcCartesianTransformationOperator3D(Axis1, Axis2, LocalOrigin, Scale, Axis3)
pub fn transformation_operator(
    resolver: &dyn EntityResolver,
    operator: &DecodedEntity,
) -> Result<Matrix4<f64>> {
    let x_hint = optional_direction(resolver, operator, 0)?;
    let origin = match fetch_attr(resolver, operator, 2)? {
        Some(p) => point3(&p)?,
        None => Point3::origin(),
    };
    let scale = operator.get_float(3).unwrap_or(1.0);
    let z = optional_direction(resolver, operator, 4)?.unwrap_or_else(Vector3::z);

    let (x, y, z) = frame(z, x_hint);
    Ok(compose(x * scale, y * scale, z * scale, origin))
}
