// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Double precision working mesh
//!
//! Geometry stays in f64 through placement, scaling and recentering so that
//! georeferenced coordinates survive; it only drops to f32 at the very end.

use super::{Matrix4, Point3, Vector3};
use ifc_frag_model::{Bounds, MeshData};

/// Triangle mesh in file or world coordinates
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Flattened [x, y, z, ...]
    pub positions: Vec<f64>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append a vertex and return its index
    #[inline]
    pub fn push_vertex(&mut self, p: Point3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.extend_from_slice(&[p.x, p.y, p.z]);
        index
    }

    #[inline]
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Vertex at `index`
    #[inline]
    pub fn vertex(&self, index: u32) -> Point3<f64> {
        let i = index as usize * 3;
        Point3::new(self.positions[i], self.positions[i + 1], self.positions[i + 2])
    }

    /// Merge another mesh into this one
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertex_count() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }

    /// Reverse the winding of every triangle
    pub fn flip(&mut self) {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }

    /// Apply an affine transform to every vertex
    ///
    /// Mirroring transforms flip the winding back so faces keep pointing out.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for p in self.positions.chunks_exact_mut(3) {
            let t = matrix.transform_point(&Point3::new(p[0], p[1], p[2]));
            p[0] = t.x;
            p[1] = t.y;
            p[2] = t.z;
        }
        if matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0 {
            self.flip();
        }
    }

    /// Uniform scale about the origin
    pub fn scale(&mut self, factor: f64) {
        if factor != 1.0 {
            for v in &mut self.positions {
                *v *= factor;
            }
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(
            self.positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]]),
        )
    }

    /// Area-weighted vertex normals, +Z for isolated vertices
    pub fn vertex_normals(&self) -> Vec<Vector3<f64>> {
        let mut normals = vec![Vector3::zeros(); self.vertex_count()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (self.vertex(tri[0]), self.vertex(tri[1]), self.vertex(tri[2]));
            // Unnormalized cross product already carries twice the area
            let n = (b - a).cross(&(c - a));
            for &i in tri {
                normals[i as usize] += n;
            }
        }
        normals
            .into_iter()
            .map(|n| {
                n.try_normalize(1e-12)
                    .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0))
            })
            .collect()
    }

    /// Convert to render data after shifting every vertex by `offset`
    ///
    /// The shift happens in f64 so large site coordinates keep their precision.
    pub fn to_mesh_data(&self, offset: [f64; 3]) -> MeshData {
        let mut data = MeshData::with_capacity(self.vertex_count(), self.indices.len());
        for p in self.positions.chunks_exact(3) {
            data.positions.extend_from_slice(&[
                (p[0] + offset[0]) as f32,
                (p[1] + offset[1]) as f32,
                (p[2] + offset[2]) as f32,
            ]);
        }
        for n in self.vertex_normals() {
            data.normals
                .extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
        }
        data.indices.extend_from_slice(&self.indices);
        data
    }
}
