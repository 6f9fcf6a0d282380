// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lazy entity lookup over an indexed buffer

use crate::scanner::{EntityIndex, EntityScanner, TypeIndex};
use crate::tokenizer::parse_entity_at;
use ifc_frag_model::{AttributeValue, DecodedEntity, EntityId, IfcType, ParseError, Result};
use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock};

/// Entity lookup and reference resolution
///
/// Geometry, unit and property extraction only depend on this trait.
pub trait EntityResolver: Send + Sync {
    /// Decode an entity by ID, `Ok(None)` if the file has no such entity
    fn get(&self, id: EntityId) -> Result<Option<Arc<DecodedEntity>>>;

    /// Follow an entity reference attribute
    fn resolve_ref(&self, attr: &AttributeValue) -> Result<Option<Arc<DecodedEntity>>> {
        match attr.as_entity_ref() {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    /// Follow every reference in a list attribute
    fn resolve_ref_list(&self, attr: &AttributeValue) -> Result<Vec<Arc<DecodedEntity>>> {
        let mut out = Vec::new();
        for item in attr.as_list().unwrap_or_default() {
            if let Some(entity) = self.resolve_ref(item)? {
                out.push(entity);
            }
        }
        Ok(out)
    }

    /// IDs of all entities of a type, in file order
    fn ids_by_type(&self, ifc_type: &IfcType) -> &[EntityId];

    /// Count entities of a type without decoding them
    fn count_by_type(&self, ifc_type: &IfcType) -> usize {
        self.ids_by_type(ifc_type).len()
    }

    /// Every indexed type together with its entity IDs
    fn types(&self) -> Vec<(&IfcType, &[EntityId])>;
}

/// Thread-safe resolver over a borrowed buffer
pub struct StepResolver<'a> {
    content: &'a str,
    index: EntityIndex,
    type_index: TypeIndex,
    cache: RwLock<FxHashMap<u32, Arc<DecodedEntity>>>,
}

impl<'a> StepResolver<'a> {
    /// Index `content` in a single scan
    pub fn new(content: &'a str) -> Self {
        let (index, type_index) = EntityScanner::build_indexes(content);
        Self {
            content,
            index,
            type_index,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Number of indexed entities
    pub fn entity_count(&self) -> usize {
        self.index.len()
    }

    fn decode(&self, id: u32) -> Result<Option<Arc<DecodedEntity>>> {
        if let Ok(cache) = self.cache.read() {
            if let Some(cached) = cache.get(&id) {
                return Ok(Some(Arc::clone(cached)));
            }
        }

        let Some(&(start, end)) = self.index.get(&id) else {
            return Ok(None);
        };

        let entity = parse_entity_at(self.content, start, end).map_err(|e| match e {
            ParseError::EntityParse(..) => e,
            other => ParseError::entity_parse(EntityId(id), other.to_string()),
        })?;
        let arc = Arc::new(entity);

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(id, Arc::clone(&arc));
        }

        Ok(Some(arc))
    }
}

impl EntityResolver for StepResolver<'_> {
    fn get(&self, id: EntityId) -> Result<Option<Arc<DecodedEntity>>> {
        self.decode(id.0)
    }

    fn ids_by_type(&self, ifc_type: &IfcType) -> &[EntityId] {
        self.type_index
            .get(ifc_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn types(&self) -> Vec<(&IfcType, &[EntityId])> {
        self.type_index
            .iter()
            .map(|(ty, ids)| (ty, ids.as_slice()))
            .collect()
    }
}
