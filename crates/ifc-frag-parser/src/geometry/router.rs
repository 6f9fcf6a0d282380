// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Router - Dynamic dispatch to geometry processors
//!
//! Routes representation items to processors by type and walks the product
//! representation chain: Element -> ProductDefinitionShape ->
//! ShapeRepresentation -> Items.

use super::error::{Error, Result};
use super::mesh::Mesh;
use super::placement::{axis2_placement_3d, fetch, fetch_attr, local_placement, transformation_operator};
use super::processors::{
    ExtrudedAreaSolidProcessor, FacetedBrepProcessor, PolygonalFaceSetProcessor,
    TriangulatedFaceSetProcessor,
};
use super::Matrix4;
use crate::resolver::EntityResolver;
use ifc_frag_model::{DecodedEntity, EntityId, IfcType};
use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock};

/// Nested MappedItem/boolean chains deeper than this are rejected
const MAX_ITEM_DEPTH: usize = 16;

/// Representation identifiers that describe the physical body
const BODY_IDENTIFIERS: [&str; 2] = ["Body", "Facetation"];

/// Geometry processor trait
///
/// Each processor handles one or more types of IFC geometry representations
/// and produces a mesh in the item's own coordinates, in file units.
pub trait GeometryProcessor: Send + Sync {
    /// Process entity into mesh
    fn process(&self, entity: &DecodedEntity, resolver: &dyn EntityResolver) -> Result<Mesh>;

    /// Get supported IFC types
    fn supported_types(&self) -> Vec<IfcType>;
}

/// Geometry router - routes entities to processors
///
/// Shareable across rayon workers: the only interior state is the cache of
/// IfcRepresentationMap geometry reused by MappedItems.
pub struct GeometryRouter {
    processors: FxHashMap<IfcType, Arc<dyn GeometryProcessor>>,
    mapped_cache: RwLock<FxHashMap<EntityId, Arc<Mesh>>>,
    unit_scale: f64,
}

impl GeometryRouter {
    /// Create new router without any processors registered
    pub fn new() -> Self {
        Self {
            processors: FxHashMap::default(),
            mapped_cache: RwLock::new(FxHashMap::default()),
            unit_scale: 1.0,
        }
    }

    /// Create router with the built-in processors registered
    pub fn with_default_processors() -> Self {
        let mut router = Self::new();
        router.register(Arc::new(ExtrudedAreaSolidProcessor::new()));
        router.register(Arc::new(TriangulatedFaceSetProcessor::new()));
        router.register(Arc::new(PolygonalFaceSetProcessor::new()));
        router.register(Arc::new(FacetedBrepProcessor::new()));
        router
    }

    /// Builder form of [`set_unit_scale`](Self::set_unit_scale)
    pub fn with_unit_scale(mut self, unit_scale: f64) -> Self {
        self.unit_scale = unit_scale;
        self
    }

    /// Get the current unit scale factor
    pub fn unit_scale(&self) -> f64 {
        self.unit_scale
    }

    /// Set the unit scale factor (e.g. 0.001 for millimetre files)
    pub fn set_unit_scale(&mut self, scale: f64) {
        self.unit_scale = scale;
    }

    /// Register a geometry processor
    pub fn register(&mut self, processor: Arc<dyn GeometryProcessor>) {
        for ifc_type in processor.supported_types() {
            self.processors.insert(ifc_type, Arc::clone(&processor));
        }
    }

    /// Check if a type can be routed
    pub fn has_processor(&self, ifc_type: &IfcType) -> bool {
        matches!(
            ifc_type,
            IfcType::IfcMappedItem | IfcType::IfcBooleanClippingResult
        ) || self.processors.contains_key(ifc_type)
    }

    /// World-space mesh of a product in meters
    ///
    /// Returns an empty mesh for products without a body representation.
    /// Items of unsupported types are skipped.
    pub fn process_element(&self, element: &DecodedEntity, resolver: &dyn EntityResolver) -> Result<Mesh> {
        let mut mesh = Mesh::new();

        // Representation at index 6 for IfcProduct
        let Some(shape) = fetch_attr(resolver, element, 6)? else {
            return Ok(mesh);
        };
        // IfcProductDefinitionShape(Name, Description, Representations)
        let representations = match shape.get(2) {
            Some(list) => resolver.resolve_ref_list(list)?,
            None => return Ok(mesh),
        };

        for rep in select_body(&representations) {
            mesh.merge(&self.process_shape_representation(rep, resolver, 0)?);
        }
        if mesh.is_empty() {
            return Ok(mesh);
        }

        // ObjectPlacement at index 5
        if let Some(placement) = element.get_ref(5) {
            mesh.transform(&local_placement(resolver, placement)?);
        }
        mesh.scale(self.unit_scale);

        Ok(mesh)
    }

    /// Merge every routable item of an IfcShapeRepresentation (Items at 3)
    fn process_shape_representation(
        &self,
        rep: &DecodedEntity,
        resolver: &dyn EntityResolver,
        depth: usize,
    ) -> Result<Mesh> {
        let mut combined = Mesh::new();
        let Some(items) = rep.get(3) else {
            return Ok(combined);
        };

        for item in resolver.resolve_ref_list(items)? {
            match self.process_item(&item, resolver, depth) {
                Ok(mesh) => combined.merge(&mesh),
                Err(Error::UnsupportedType(ty)) => {
                    log::debug!("[Parser] skipping item {}: unsupported {ty}", item.id);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(combined)
    }

    /// Mesh of one representation item in its own coordinates, file units
    pub fn process_item(&self, item: &DecodedEntity, resolver: &dyn EntityResolver, depth: usize) -> Result<Mesh> {
        if depth > MAX_ITEM_DEPTH {
            return Err(Error::placement(format!("item nesting too deep at {}", item.id)));
        }

        match item.ifc_type {
            IfcType::IfcMappedItem => self.process_mapped_item(item, resolver, depth),
            // Operator, FirstOperand, SecondOperand: the clipped result is
            // approximated by the unclipped first operand
            IfcType::IfcBooleanClippingResult => {
                let first = fetch_attr(resolver, item, 1)?
                    .ok_or_else(|| Error::invalid_attribute(1, "Missing FirstOperand"))?;
                self.process_item(&first, resolver, depth + 1)
            }
            ref ty => {
                let processor = self
                    .processors
                    .get(ty)
                    .ok_or_else(|| Error::unsupported_type(ty.name()))?;
                processor.process(item, resolver)
            }
        }
    }

    /// IfcMappedItem(MappingSource, MappingTarget)
    fn process_mapped_item(&self, item: &DecodedEntity, resolver: &dyn EntityResolver, depth: usize) -> Result<Mesh> {
        let source_id = item
            .get_ref(0)
            .ok_or_else(|| Error::invalid_attribute(0, "Missing MappingSource"))?;

        let cached = self
            .mapped_cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&source_id).cloned());
        let source_mesh = match cached {
            Some(mesh) => mesh,
            None => {
                let mesh = Arc::new(self.process_representation_map(source_id, resolver, depth)?);
                if let Ok(mut cache) = self.mapped_cache.write() {
                    cache.insert(source_id, Arc::clone(&mesh));
                }
                mesh
            }
        };

        let mut mesh = (*source_mesh).clone();
        if let Some(target) = fetch_attr(resolver, item, 1)? {
            mesh.transform(&transformation_operator(resolver, &target)?);
        }
        Ok(mesh)
    }

    /// IfcRepresentationMap(MappingOrigin, MappedRepresentation)
    fn process_representation_map(&self, id: EntityId, resolver: &dyn EntityResolver, depth: usize) -> Result<Mesh> {
        let map = fetch(resolver, id)?;
        let rep = fetch_attr(resolver, &map, 1)?
            .ok_or_else(|| Error::invalid_attribute(1, "Missing MappedRepresentation"))?;
        let mut mesh = self.process_shape_representation(&rep, resolver, depth + 1)?;

        if let Some(origin) = fetch_attr(resolver, &map, 0)? {
            let matrix = match origin.ifc_type {
                IfcType::IfcAxis2Placement3D => axis2_placement_3d(resolver, &origin)?,
                _ => Matrix4::identity(),
            };
            mesh.transform(&matrix);
        }
        Ok(mesh)
    }
}

impl Default for GeometryRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Body representations if the product has any, else the unlabelled ones
fn select_body(representations: &[Arc<DecodedEntity>]) -> Vec<&DecodedEntity> {
    // RepresentationIdentifier at index 1
    let body: Vec<&DecodedEntity> = representations
        .iter()
        .map(Arc::as_ref)
        .filter(|r| r.get_string(1).is_some_and(|id| BODY_IDENTIFIERS.contains(&id)))
        .collect();
    if !body.is_empty() {
        return body;
    }

    representations
        .iter()
        .map(Arc::as_ref)
        .filter(|r| r.get_string(1).is_none())
        .collect()
}
