// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D profiles and their extrusion into solids

use super::error::{Error, Result};
use super::mesh::Mesh;
use super::triangulation::{signed_area, triangulate_polygon_with_holes};
use super::{Matrix3, Point2, Point3, Vector3};

/// 2D Profile with optional holes
#[derive(Debug, Clone)]
pub struct Profile2D {
    /// Outer boundary
    pub outer: Vec<Point2<f64>>,
    /// Holes
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Profile2D {
    /// Create a new profile
    pub fn new(outer: Vec<Point2<f64>>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// Add a hole to the profile
    pub fn add_hole(&mut self, hole: Vec<Point2<f64>>) {
        self.holes.push(hole);
    }

    /// Create a rectangular profile centered at origin
    pub fn rectangle(width: f64, height: f64) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;

        Self::new(vec![
            Point2::new(-half_w, -half_h),
            Point2::new(half_w, -half_h),
            Point2::new(half_w, half_h),
            Point2::new(-half_w, half_h),
        ])
    }

    /// Create a circular profile centered at origin
    pub fn circle(radius: f64, segments: Option<usize>) -> Self {
        let segments = segments.unwrap_or_else(|| calculate_circle_segments(radius));
        let outer = (0..segments)
            .map(|i| {
                let angle = std::f64::consts::TAU * (i as f64) / (segments as f64);
                Point2::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect();

        Self::new(outer)
    }

    /// Apply a 2D placement given as a homogeneous 3x3 matrix
    pub fn transform(&mut self, matrix: &Matrix3<f64>) {
        let apply = |p: &mut Point2<f64>| *p = matrix.transform_point(p);
        self.outer.iter_mut().for_each(apply);
        self.holes.iter_mut().flatten().for_each(apply);
    }

    /// Orient the outer ring counter-clockwise and holes clockwise
    pub fn normalize_winding(&mut self) {
        if signed_area(&self.outer) < 0.0 {
            self.outer.reverse();
        }
        for hole in &mut self.holes {
            if signed_area(hole) > 0.0 {
                hole.reverse();
            }
        }
    }

    /// Extrude along `direction` by `depth`
    ///
    /// The profile lies in the local XY plane. Caps and side walls get separate
    /// vertices so shading stays flat along the edges.
    pub fn extrude(&self, direction: &Vector3<f64>, depth: f64) -> Result<Mesh> {
        if self.outer.len() < 3 {
            return Err(Error::profile("Profile must have at least 3 vertices"));
        }
        let direction = direction
            .try_normalize(1e-12)
            .ok_or_else(|| Error::profile("zero extrusion direction"))?;
        if depth <= 0.0 {
            return Err(Error::profile(format!("non-positive depth {depth}")));
        }

        let mut profile = self.clone();
        profile.holes.retain(|h| h.len() >= 3);
        profile.normalize_winding();

        let offset = direction * depth;
        let rings: Vec<&[Point2<f64>]> = std::iter::once(profile.outer.as_slice())
            .chain(profile.holes.iter().map(Vec::as_slice))
            .collect();
        let cap_points: Vec<Point2<f64>> = rings.iter().flat_map(|r| r.iter().copied()).collect();
        let mut cap = triangulate_polygon_with_holes(&profile.outer, &profile.holes)?;
        for tri in cap.chunks_exact_mut(3) {
            let (a, b, c) = (&cap_points[tri[0]], &cap_points[tri[1]], &cap_points[tri[2]]);
            if (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x) < 0.0 {
                tri.swap(1, 2);
            }
        }

        let vertex_total = cap_points.len() * 2 + cap_points.len() * 4;
        let mut mesh = Mesh::with_capacity(vertex_total, cap.len() * 2 + cap_points.len() * 6);

        let lift = |p: &Point2<f64>| Point3::new(p.x, p.y, 0.0);

        // Bottom cap faces against the extrusion, top cap along it
        let bottom: Vec<u32> = cap_points.iter().map(|p| mesh.push_vertex(lift(p))).collect();
        let top: Vec<u32> = cap_points
            .iter()
            .map(|p| mesh.push_vertex(lift(p) + offset))
            .collect();
        for tri in cap.chunks_exact(3) {
            mesh.push_triangle(bottom[tri[0]], bottom[tri[2]], bottom[tri[1]]);
            mesh.push_triangle(top[tri[0]], top[tri[1]], top[tri[2]]);
        }

        for ring in rings {
            let n = ring.len();
            for i in 0..n {
                let p0 = lift(&ring[i]);
                let p1 = lift(&ring[(i + 1) % n]);
                let a = mesh.push_vertex(p0);
                let b = mesh.push_vertex(p1);
                let c = mesh.push_vertex(p1 + offset);
                let d = mesh.push_vertex(p0 + offset);
                mesh.push_triangle(a, b, c);
                mesh.push_triangle(a, c, d);
            }
        }

        // Extruding "downwards" turns the solid inside out
        if direction.z < 0.0 {
            mesh.flip();
        }

        Ok(mesh)
    }
}

/// Calculate adaptive number of segments for a circle
#[inline]
pub fn calculate_circle_segments(radius: f64) -> usize {
    let segments = (radius.abs().sqrt() * 8.0).ceil() as usize;
    segments.clamp(8, 32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Signed volume via the divergence theorem, positive for outward faces
    fn volume(mesh: &Mesh) -> f64 {
        mesh.indices
            .chunks_exact(3)
            .map(|t| {
                let (a, b, c) = (mesh.vertex(t[0]), mesh.vertex(t[1]), mesh.vertex(t[2]));
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum()
    }

    #[test]
    fn test_rectangle_profile() {
        let profile = Profile2D::rectangle(10.0, 5.0);
        assert_eq!(profile.outer.len(), 4);
        assert_eq!(profile.holes.len(), 0);
    }

    #[test]
    fn test_circle_profile() {
        let profile = Profile2D::circle(5.0, None);
        assert!(profile.outer.len() >= 8);
        assert_eq!(calculate_circle_segments(0.01), 8);
        assert_eq!(calculate_circle_segments(10_000.0), 32);
    }

    #[test]
    fn test_extruded_box_volume() {
        let mesh = Profile2D::rectangle(2.0, 1.0)
            .extrude(&Vector3::z(), 3.0)
            .unwrap();

        assert_eq!(mesh.triangle_count(), 2 * 2 + 4 * 2);
        assert_relative_eq!(volume(&mesh), 6.0, epsilon = 1e-9);
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, [-1.0, -0.5, 0.0]);
        assert_eq!(bounds.max, [1.0, 0.5, 3.0]);
    }

    #[test]
    fn test_clockwise_profile_and_downward_extrusion_stay_outward() {
        let mut profile = Profile2D::rectangle(1.0, 1.0);
        profile.outer.reverse();
        let mesh = profile.extrude(&-Vector3::z(), 2.0).unwrap();
        assert_relative_eq!(volume(&mesh), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_extrusion_with_hole() {
        let mut profile = Profile2D::rectangle(4.0, 4.0);
        profile.add_hole(Profile2D::rectangle(2.0, 2.0).outer);
        let mesh = profile.extrude(&Vector3::z(), 1.0).unwrap();
        assert_relative_eq!(volume(&mesh), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_degenerate_input() {
        let profile = Profile2D::rectangle(1.0, 1.0);
        assert!(profile.extrude(&Vector3::zeros(), 1.0).is_err());
        assert!(profile.extrude(&Vector3::z(), 0.0).is_err());
        assert!(Profile2D::new(vec![]).extrude(&Vector3::z(), 1.0).is_err());
    }

    #[test]
    fn test_profile_placement() {
        let mut profile = Profile2D::rectangle(2.0, 2.0);
        profile.transform(&Matrix3::new_translation(&nalgebra::Vector2::new(5.0, 0.0)));
        assert_relative_eq!(profile.outer[0].x, 4.0);
    }
}
