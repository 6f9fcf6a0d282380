// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Processors - Handlers for the supported representation items
//!
//! Each processor turns one family of IFC items into a mesh in the item's
//! own coordinate system (file units, before object placement).

use super::error::{Error, Result};
use super::mesh::Mesh;
use super::placement::{
    axis2_placement_2d, axis2_placement_3d, direction3, fetch_attr, floats, point2, point3,
};
use super::profile::Profile2D;
use super::router::GeometryProcessor;
use super::triangulation::triangulate_face;
use super::{Point2, Point3, Vector3};
use crate::resolver::EntityResolver;
use ifc_frag_model::{AttributeValue, DecodedEntity, IfcType};

// ============================================================================
// Shared curve and point-list helpers
// ============================================================================

/// Drop a closing point that repeats the first one
fn open_ring<P: Copy>(mut points: Vec<P>, same: impl Fn(&P, &P) -> bool) -> Vec<P> {
    if points.len() > 1 && same(&points[0], &points[points.len() - 1]) {
        points.pop();
    }
    points
}

fn same2(a: &Point2<f64>, b: &Point2<f64>) -> bool {
    (a - b).norm() < 1e-10
}

fn same3(a: &Point3<f64>, b: &Point3<f64>) -> bool {
    (a - b).norm() < 1e-10
}

/// CoordList of an IfcCartesianPointList2D/3D
fn coord_list(resolver: &dyn EntityResolver, entity: &DecodedEntity, index: usize) -> Result<Vec<Point3<f64>>> {
    let list = fetch_attr(resolver, entity, index)?
        .ok_or_else(|| Error::invalid_attribute(index, "missing point list"))?;
    let coords = list
        .get_list(0)
        .ok_or_else(|| Error::invalid_attribute(0, "missing CoordList"))?;

    coords
        .iter()
        .map(|c| match floats(Some(c)).as_slice() {
            [x, y] => Ok(Point3::new(*x, *y, 0.0)),
            [x, y, z, ..] => Ok(Point3::new(*x, *y, *z)),
            _ => Err(Error::invalid_attribute(0, "short coordinate tuple")),
        })
        .collect()
}

/// 1-based index into a point list of length `len`
fn one_based(value: &AttributeValue, len: usize) -> Result<usize> {
    let raw = value
        .as_integer()
        .or_else(|| value.as_float().map(|f| f.round() as i64))
        .ok_or_else(|| Error::invalid_attribute(0, "non-numeric index"))?;
    if raw < 1 || raw as usize > len {
        return Err(Error::invalid_attribute(0, format!("index {raw} outside 1..={len}")));
    }
    Ok(raw as usize - 1)
}

/// Optional PnIndex remapping used by IFC4 tessellations
fn pn_index(entity: &DecodedEntity, index: usize, len: usize) -> Result<Option<Vec<usize>>> {
    entity
        .get_list(index)
        .map(|list| list.iter().map(|v| one_based(v, len)).collect())
        .transpose()
}

fn resolve_index(value: &AttributeValue, points: usize, remap: Option<&[usize]>) -> Result<usize> {
    match remap {
        Some(remap) => Ok(remap[one_based(value, remap.len())?]),
        None => one_based(value, points),
    }
}

/// Points of a bounded 2D curve used as a profile boundary
fn curve_points(resolver: &dyn EntityResolver, curve: &DecodedEntity) -> Result<Vec<Point2<f64>>> {
    let points = match curve.ifc_type {
        IfcType::IfcPolyline => {
            // Points at index 0
            resolver
                .resolve_ref_list(curve.get(0).ok_or_else(|| Error::invalid_attribute(0, "Missing Points"))?)?
                .iter()
                .map(|p| point2(p))
                .collect::<Result<Vec<_>>>()?
        }
        IfcType::IfcIndexedPolyCurve => {
            // Points at 0, optional Segments at 1
            let all: Vec<Point2<f64>> = coord_list(resolver, curve, 0)?
                .into_iter()
                .map(|p| Point2::new(p.x, p.y))
                .collect();
            match curve.get_list(1) {
                Some(segments) => segment_points(segments, &all)?,
                None => all,
            }
        }
        ref other => return Err(Error::unsupported_type(format!("curve {other}"))),
    };

    Ok(open_ring(points, same2))
}

/// Walk IfcLineIndex/IfcArcIndex segments; arcs keep their three points
fn segment_points(segments: &[AttributeValue], all: &[Point2<f64>]) -> Result<Vec<Point2<f64>>> {
    let mut out: Vec<usize> = Vec::new();
    for segment in segments {
        let indices = match segment {
            AttributeValue::TypedValue(_, args) => args.first().and_then(AttributeValue::as_list),
            other => other.as_list(),
        }
        .unwrap_or_default();

        for value in indices {
            let i = one_based(value, all.len())?;
            if out.last() != Some(&i) {
                out.push(i);
            }
        }
    }
    Ok(out.into_iter().map(|i| all[i]).collect())
}

// ============================================================================
// ExtrudedAreaSolid
// ============================================================================

/// IfcExtrudedAreaSolid(SweptArea, Position, ExtrudedDirection, Depth)
///
/// Rectangle, circle and arbitrary closed profiles, with or without voids.
#[derive(Default)]
pub struct ExtrudedAreaSolidProcessor;

impl ExtrudedAreaSolidProcessor {
    pub fn new() -> Self {
        Self
    }

    fn extract_profile(&self, resolver: &dyn EntityResolver, profile: &DecodedEntity) -> Result<Profile2D> {
        let mut result = match profile.ifc_type {
            // ProfileType, ProfileName, Position, XDim, YDim
            IfcType::IfcRectangleProfileDef => {
                let (x, y) = (profile.get_float(3), profile.get_float(4));
                match (x, y) {
                    (Some(x), Some(y)) if x > 0.0 && y > 0.0 => Profile2D::rectangle(x, y),
                    _ => return Err(Error::profile(format!("bad rectangle dims on {}", profile.id))),
                }
            }
            // ProfileType, ProfileName, Position, Radius
            IfcType::IfcCircleProfileDef => match profile.get_float(3) {
                Some(r) if r > 0.0 => Profile2D::circle(r, None),
                _ => return Err(Error::profile(format!("bad circle radius on {}", profile.id))),
            },
            // ProfileType, ProfileName, OuterCurve[, InnerCurves]
            IfcType::IfcArbitraryClosedProfileDef | IfcType::IfcArbitraryProfileDefWithVoids => {
                let outer = fetch_attr(resolver, profile, 2)?
                    .ok_or_else(|| Error::invalid_attribute(2, "Missing OuterCurve"))?;
                let mut result = Profile2D::new(curve_points(resolver, &outer)?);
                if profile.ifc_type == IfcType::IfcArbitraryProfileDefWithVoids {
                    if let Some(inner) = profile.get(3) {
                        for curve in resolver.resolve_ref_list(inner)? {
                            result.add_hole(curve_points(resolver, &curve)?);
                        }
                    }
                }
                return Ok(result);
            }
            ref other => return Err(Error::unsupported_type(format!("profile {other}"))),
        };

        // Parameterized profiles carry their own 2D placement
        if let Some(position) = fetch_attr(resolver, profile, 2)? {
            result.transform(&axis2_placement_2d(resolver, &position)?);
        }
        Ok(result)
    }
}

impl GeometryProcessor for ExtrudedAreaSolidProcessor {
    fn process(&self, entity: &DecodedEntity, resolver: &dyn EntityResolver) -> Result<Mesh> {
        let swept = fetch_attr(resolver, entity, 0)?
            .ok_or_else(|| Error::invalid_attribute(0, "Missing SweptArea"))?;
        let profile = self.extract_profile(resolver, &swept)?;

        let direction = fetch_attr(resolver, entity, 2)?
            .and_then(|d| direction3(&d))
            .unwrap_or_else(Vector3::z);
        let depth = entity
            .get_float(3)
            .ok_or_else(|| Error::invalid_attribute(3, "Missing Depth"))?;

        let mut mesh = profile.extrude(&direction, depth)?;
        if let Some(position) = fetch_attr(resolver, entity, 1)? {
            mesh.transform(&axis2_placement_3d(resolver, &position)?);
        }
        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcExtrudedAreaSolid]
    }
}

// ============================================================================
// Tessellated face sets
// ============================================================================

/// IfcTriangulatedFaceSet(Coordinates, Normals, Closed, CoordIndex, PnIndex)
#[derive(Default)]
pub struct TriangulatedFaceSetProcessor;

impl TriangulatedFaceSetProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryProcessor for TriangulatedFaceSetProcessor {
    fn process(&self, entity: &DecodedEntity, resolver: &dyn EntityResolver) -> Result<Mesh> {
        let points = coord_list(resolver, entity, 0)?;
        let remap = pn_index(entity, 4, points.len())?;
        let faces = entity
            .get_list(3)
            .ok_or_else(|| Error::invalid_attribute(3, "Missing CoordIndex"))?;

        let mut mesh = Mesh::with_capacity(points.len(), faces.len() * 3);
        for p in &points {
            mesh.push_vertex(*p);
        }
        for face in faces {
            let corners = face
                .as_list()
                .filter(|c| c.len() >= 3)
                .ok_or_else(|| Error::invalid_attribute(3, "triangle needs three indices"))?;
            let mut tri = [0u32; 3];
            for (slot, value) in tri.iter_mut().zip(corners) {
                *slot = resolve_index(value, points.len(), remap.as_deref())? as u32;
            }
            mesh.push_triangle(tri[0], tri[1], tri[2]);
        }

        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcTriangulatedFaceSet]
    }
}

/// IfcPolygonalFaceSet(Coordinates, Closed, Faces, PnIndex)
///
/// Faces are IfcIndexedPolygonalFace(CoordIndex), optionally with
/// InnerCoordIndices at 1 for faces with voids.
#[derive(Default)]
pub struct PolygonalFaceSetProcessor;

impl PolygonalFaceSetProcessor {
    pub fn new() -> Self {
        Self
    }

    fn loop_points(
        &self,
        indices: &[AttributeValue],
        points: &[Point3<f64>],
        remap: Option<&[usize]>,
    ) -> Result<Vec<Point3<f64>>> {
        indices
            .iter()
            .map(|v| Ok(points[resolve_index(v, points.len(), remap)?]))
            .collect()
    }
}

impl GeometryProcessor for PolygonalFaceSetProcessor {
    fn process(&self, entity: &DecodedEntity, resolver: &dyn EntityResolver) -> Result<Mesh> {
        let points = coord_list(resolver, entity, 0)?;
        let remap = pn_index(entity, 3, points.len())?;
        let faces = resolver.resolve_ref_list(
            entity
                .get(2)
                .ok_or_else(|| Error::invalid_attribute(2, "Missing Faces"))?,
        )?;

        let mut mesh = Mesh::new();
        for face in faces {
            let outer = face
                .get_list(0)
                .ok_or_else(|| Error::invalid_attribute(0, "Missing CoordIndex"))?;
            let outer = self.loop_points(outer, &points, remap.as_deref())?;
            let holes = match face.get_list(1) {
                Some(inner) => inner
                    .iter()
                    .filter_map(AttributeValue::as_list)
                    .map(|l| self.loop_points(l, &points, remap.as_deref()))
                    .collect::<Result<Vec<_>>>()?,
                None => Vec::new(),
            };
            push_face(&mut mesh, outer, holes)?;
        }

        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcPolygonalFaceSet]
    }
}

/// Triangulate one planar face into `mesh`, skipping degenerate faces
fn push_face(mesh: &mut Mesh, outer: Vec<Point3<f64>>, holes: Vec<Vec<Point3<f64>>>) -> Result<()> {
    let outer = open_ring(outer, same3);
    if outer.len() < 3 {
        return Ok(());
    }
    let holes: Vec<Vec<Point3<f64>>> = holes
        .into_iter()
        .map(|h| open_ring(h, same3))
        .filter(|h| h.len() >= 3)
        .collect();

    let indices = match triangulate_face(&outer, &holes) {
        Ok(indices) => indices,
        // Slivers and collinear loops carry no area
        Err(Error::Triangulation(_)) => return Ok(()),
        Err(e) => return Err(e),
    };

    let base: Vec<u32> = outer
        .iter()
        .chain(holes.iter().flatten())
        .map(|p| mesh.push_vertex(*p))
        .collect();
    for tri in indices.chunks_exact(3) {
        mesh.push_triangle(base[tri[0]], base[tri[1]], base[tri[2]]);
    }
    Ok(())
}

// ============================================================================
// FacetedBrep
// ============================================================================

/// IfcFacetedBrep(Outer) and IfcFacetedBrepWithVoids(Outer, Voids)
///
/// Shells are IfcClosedShell(CfsFaces); faces are IfcFace(Bounds) where each
/// bound is IfcFaceBound/IfcFaceOuterBound(Bound, Orientation) over a PolyLoop.
#[derive(Default)]
pub struct FacetedBrepProcessor;

impl FacetedBrepProcessor {
    pub fn new() -> Self {
        Self
    }

    fn loop_points(&self, resolver: &dyn EntityResolver, bound: &DecodedEntity) -> Result<Vec<Point3<f64>>> {
        let Some(poly_loop) = fetch_attr(resolver, bound, 0)? else {
            return Ok(Vec::new());
        };
        if poly_loop.ifc_type != IfcType::IfcPolyLoop {
            return Err(Error::unsupported_type(format!("face bound {}", poly_loop.ifc_type)));
        }

        let mut points = resolver
            .resolve_ref_list(poly_loop.get(0).ok_or_else(|| Error::invalid_attribute(0, "Missing Polygon"))?)?
            .iter()
            .map(|p| point3(p))
            .collect::<Result<Vec<_>>>()?;

        // Orientation .F. reverses the loop
        if bound.get(1).and_then(AttributeValue::as_bool) == Some(false) {
            points.reverse();
        }
        Ok(points)
    }

    fn process_shell(&self, resolver: &dyn EntityResolver, shell: &DecodedEntity, mesh: &mut Mesh) -> Result<()> {
        let faces = resolver.resolve_ref_list(
            shell
                .get(0)
                .ok_or_else(|| Error::invalid_attribute(0, "Missing CfsFaces"))?,
        )?;

        for face in faces {
            let bounds = resolver.resolve_ref_list(
                face.get(0)
                    .ok_or_else(|| Error::invalid_attribute(0, "Missing Bounds"))?,
            )?;

            let outer_at = bounds
                .iter()
                .position(|b| b.ifc_type == IfcType::IfcFaceOuterBound)
                .unwrap_or(0);

            let mut outer = Vec::new();
            let mut holes = Vec::new();
            for (i, bound) in bounds.iter().enumerate() {
                let points = self.loop_points(resolver, bound)?;
                if i == outer_at {
                    outer = points;
                } else {
                    holes.push(points);
                }
            }
            push_face(mesh, outer, holes)?;
        }
        Ok(())
    }
}

impl GeometryProcessor for FacetedBrepProcessor {
    fn process(&self, entity: &DecodedEntity, resolver: &dyn EntityResolver) -> Result<Mesh> {
        let mut mesh = Mesh::new();

        let outer = fetch_attr(resolver, entity, 0)?
            .ok_or_else(|| Error::invalid_attribute(0, "Missing Outer"))?;
        self.process_shell(resolver, &outer, &mut mesh)?;

        if entity.ifc_type == IfcType::IfcFacetedBrepWithVoids {
            for void in resolver.resolve_ref_list(entity.get(1).unwrap_or(&AttributeValue::Null))? {
                // Void shells face into the cavity
                let mut cavity = Mesh::new();
                self.process_shell(resolver, &void, &mut cavity)?;
                cavity.flip();
                mesh.merge(&cavity);
            }
        }

        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcFacetedBrep, IfcType::IfcFacetedBrepWithVoids]
    }
}
