// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for 2D polygons, plus the projections needed to
//! triangulate planar 3D faces.

use super::error::{Error, Result};
use super::{Point2, Point3, Vector3};

/// Check if a polygon is convex (all cross products have same sign)
#[inline]
fn is_convex(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut sign = 0i8;
    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);
        if cross.abs() > 1e-10 {
            let current = if cross > 0.0 { 1 } else { -1 };
            if sign == 0 {
                sign = current;
            } else if sign != current {
                return false;
            }
        }
    }

    true
}

#[inline]
fn fan_triangulate(n: usize) -> Vec<usize> {
    (1..n - 1).flat_map(|i| [0, i, i + 1]).collect()
}

/// Signed area, positive for counter-clockwise rings
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (&points[i], &points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

/// Triangulate a simple polygon (no holes)
///
/// Returns triangle indices into the input points.
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();
    if n < 3 {
        return Err(Error::triangulation("Need at least 3 points to triangulate"));
    }
    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }
    if n <= 8 && is_convex(points) {
        return Ok(fan_triangulate(n));
    }

    let vertices: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    earcutr::earcut(&vertices, &[], 2).map_err(|e| Error::triangulation(format!("{e:?}")))
}

/// Triangulate a polygon with holes
///
/// Returns triangle indices into the concatenation of `outer` and every hole
/// with at least three points, in order.
pub fn triangulate_polygon_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    if outer.len() < 3 {
        return Err(Error::triangulation(
            "Need at least 3 points in outer boundary",
        ));
    }

    let holes: Vec<&Vec<Point2<f64>>> = holes.iter().filter(|h| h.len() >= 3).collect();
    if holes.is_empty() {
        return triangulate_polygon(outer);
    }

    let total = outer.len() + holes.iter().map(|h| h.len()).sum::<usize>();
    let mut vertices = Vec::with_capacity(total * 2);
    vertices.extend(outer.iter().flat_map(|p| [p.x, p.y]));

    let mut hole_indices = Vec::with_capacity(holes.len());
    for hole in holes {
        hole_indices.push(vertices.len() / 2);
        vertices.extend(hole.iter().flat_map(|p| [p.x, p.y]));
    }

    earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::triangulation(format!("{e:?}")))
}

/// In-plane basis for projecting a planar 3D polygon
#[derive(Clone, Copy, Debug)]
pub struct PlaneBasis {
    pub origin: Point3<f64>,
    pub u: Vector3<f64>,
    pub v: Vector3<f64>,
}

impl PlaneBasis {
    /// Right-handed basis with `u × v` along `normal`
    pub fn new(origin: Point3<f64>, normal: &Vector3<f64>) -> Self {
        let reference = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
            Vector3::x()
        } else if normal.y.abs() <= normal.z.abs() {
            Vector3::y()
        } else {
            Vector3::z()
        };

        let u = reference.cross(normal).normalize();
        let v = normal.cross(&u).normalize();
        Self { origin, u, v }
    }

    pub fn project(&self, points: &[Point3<f64>]) -> Vec<Point2<f64>> {
        points
            .iter()
            .map(|p| {
                let d = p - self.origin;
                Point2::new(d.dot(&self.u), d.dot(&self.v))
            })
            .collect()
    }
}

/// Calculate the unit normal of a polygon from its vertices
///
/// Newell's method, so concave and slightly non-planar loops are fine.
pub fn calculate_polygon_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let mut normal = Vector3::<f64>::zeros();
    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal.try_normalize(1e-12)
}

/// Triangulate a planar 3D face with optional holes
///
/// Triangles come back wound like `outer`. Returned indices address the
/// concatenation of `outer` and the holes that were kept.
pub fn triangulate_face(
    outer: &[Point3<f64>],
    holes: &[Vec<Point3<f64>>],
) -> Result<Vec<usize>> {
    if outer.len() == 3 && holes.is_empty() {
        return Ok(vec![0, 1, 2]);
    }

    let normal = calculate_polygon_normal(outer)
        .ok_or_else(|| Error::triangulation("degenerate face"))?;
    let basis = PlaneBasis::new(outer[0], &normal);

    let outer_2d = basis.project(outer);
    let holes_2d: Vec<Vec<Point2<f64>>> = holes.iter().map(|h| basis.project(h)).collect();

    let mut indices = triangulate_polygon_with_holes(&outer_2d, &holes_2d)?;

    // earcut emits a fixed orientation; the projected outer ring is CCW
    // because the basis follows the face normal, so match that
    let all: Vec<Point2<f64>> = outer_2d
        .iter()
        .chain(holes_2d.iter().filter(|h| h.len() >= 3).flatten())
        .copied()
        .collect();
    for tri in indices.chunks_exact_mut(3) {
        let (a, b, c) = (&all[tri[0]], &all[tri[1]], &all[tri[2]]);
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        if cross < 0.0 {
            tri.swap(1, 2);
        }
    }

    Ok(indices)
}
