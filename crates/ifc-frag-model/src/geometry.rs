// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render-ready mesh data, bounding volumes and category colors

use crate::IfcType;
use serde::{Deserialize, Serialize};

/// GPU-ready mesh data
///
/// Contains flattened vertex data suitable for GPU rendering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions as flattened [x, y, z, x, y, z, ...]
    pub positions: Vec<f32>,
    /// Vertex normals as flattened [nx, ny, nz, nx, ny, nz, ...]
    pub normals: Vec<f32>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create mesh with pre-allocated capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Check if mesh is empty
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Merge another mesh into this one
    pub fn merge(&mut self, other: &MeshData) {
        let vertex_offset = self.vertex_count() as u32;

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|i| i + vertex_offset));
    }

    /// Axis-aligned bounds of all vertices, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Bounds> {
        let mut bounds: Option<Bounds> = None;
        for p in self.positions.chunks_exact(3) {
            let point = [p[0] as f64, p[1] as f64, p[2] as f64];
            match bounds.as_mut() {
                Some(b) => b.expand(point),
                None => bounds = Some(Bounds::from_point(point)),
            }
        }
        bounds
    }
}

/// Axis-aligned bounding box in double precision
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Bounds {
    /// Degenerate box around a single point
    pub fn from_point(point: [f64; 3]) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Smallest box containing all points, `None` if there are none
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f64; 3]>,
    {
        let mut iter = points.into_iter();
        let mut bounds = Self::from_point(iter.next()?);
        for p in iter {
            bounds.expand(p);
        }
        Some(bounds)
    }

    /// Grow to include `point`
    pub fn expand(&mut self, point: [f64; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(point[axis]);
            self.max[axis] = self.max[axis].max(point[axis]);
        }
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut out = *self;
        out.expand(other.min);
        out.expand(other.max);
        out
    }

    /// Center point
    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Edge lengths along each axis
    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Copy shifted by `offset`
    pub fn translated(&self, offset: [f64; 3]) -> Bounds {
        Bounds {
            min: [
                self.min[0] + offset[0],
                self.min[1] + offset[1],
                self.min[2] + offset[2],
            ],
            max: [
                self.max[0] + offset[0],
                self.max[1] + offset[1],
                self.max[2] + offset[2],
            ],
        }
    }

    /// Whether both corners lie within `epsilon` of `other`'s
    pub fn approx_eq(&self, other: &Bounds, epsilon: f64) -> bool {
        (0..3).all(|axis| {
            (self.min[axis] - other.min[axis]).abs() <= epsilon
                && (self.max[axis] - other.max[axis]).abs() <= epsilon
        })
    }
}

/// Get default color for an IFC type
///
/// Provides consistent colors for different element types.
pub fn get_default_color(ifc_type: &IfcType) -> [f32; 4] {
    match ifc_type {
        // Walls - light beige/tan
        IfcType::IfcWall | IfcType::IfcWallStandardCase => [0.85, 0.80, 0.70, 1.0],

        // Curtain walls - blue-gray glass
        IfcType::IfcCurtainWall => [0.6, 0.7, 0.8, 0.7],

        // Slabs/floors - light gray concrete
        IfcType::IfcSlab => [0.75, 0.75, 0.75, 1.0],

        // Roofs - terracotta/clay
        IfcType::IfcRoof => [0.72, 0.45, 0.35, 1.0],

        // Beams - structural blue-gray
        IfcType::IfcBeam => [0.55, 0.60, 0.65, 1.0],

        // Columns - structural gray
        IfcType::IfcColumn => [0.60, 0.60, 0.60, 1.0],

        // Doors - wood brown
        IfcType::IfcDoor => [0.55, 0.40, 0.25, 1.0],

        // Windows - light blue glass
        IfcType::IfcWindow => [0.7, 0.85, 0.95, 0.5],

        // Stairs and ramps - warm gray
        IfcType::IfcStair
        | IfcType::IfcStairFlight
        | IfcType::IfcRamp
        | IfcType::IfcRampFlight => [0.70, 0.68, 0.65, 1.0],

        // Railings - metallic gray
        IfcType::IfcRailing => [0.50, 0.50, 0.55, 1.0],

        // Coverings - white
        IfcType::IfcCovering => [0.95, 0.95, 0.95, 1.0],

        // Plates - steel blue
        IfcType::IfcPlate => [0.60, 0.65, 0.70, 1.0],

        // Members - structural
        IfcType::IfcMember => [0.58, 0.58, 0.58, 1.0],

        // Footings and piles - concrete gray
        IfcType::IfcFooting => [0.65, 0.65, 0.65, 1.0],
        IfcType::IfcPile => [0.55, 0.55, 0.55, 1.0],

        // Reinforcement - rust
        IfcType::IfcReinforcingElement
        | IfcType::IfcReinforcingBar
        | IfcType::IfcReinforcingMesh => [0.55, 0.35, 0.25, 1.0],
        IfcType::IfcTendon | IfcType::IfcTendonAnchor => [0.45, 0.45, 0.50, 1.0],

        // Furniture - wood tones
        IfcType::IfcFurnishingElement | IfcType::IfcFurniture => [0.65, 0.50, 0.35, 1.0],

        // MEP elements
        IfcType::IfcDistributionElement | IfcType::IfcDistributionFlowElement => {
            [0.5, 0.7, 0.5, 1.0]
        }
        IfcType::IfcFlowTerminal => [0.7, 0.7, 0.5, 1.0],
        IfcType::IfcFlowSegment => [0.5, 0.5, 0.7, 1.0],
        IfcType::IfcFlowFitting => [0.6, 0.5, 0.6, 1.0],

        // Spaces - faint translucent blue
        IfcType::IfcSpace => [0.6, 0.75, 0.9, 0.2],

        // Building element proxy - purple (catch-all)
        IfcType::IfcBuildingElementProxy => [0.7, 0.5, 0.8, 1.0],

        // Default - medium gray
        _ => [0.7, 0.7, 0.7, 1.0],
    }
}
