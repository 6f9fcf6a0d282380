// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element geometry
//!
//! Turns IFC body representations into triangle meshes:
//!
//! - **Profiles**: rectangle, circle and arbitrary closed profiles, with voids
//! - **Extrusion**: swept solids from profiles
//! - **Tessellations**: triangulated and polygonal face sets, faceted breps
//! - **Instancing**: MappedItems through IfcRepresentationMap
//! - **Placement**: nested IfcLocalPlacement chains
//!
//! Items are built in file units and double precision; elements are scaled to
//! meters after placement.

pub mod error;
pub mod mesh;
pub mod placement;
pub mod processors;
pub mod profile;
pub mod router;
pub mod triangulation;

pub use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3};

pub use error::{Error, Result};
pub use mesh::Mesh;
pub use profile::{calculate_circle_segments, Profile2D};
pub use router::{GeometryProcessor, GeometryRouter};
