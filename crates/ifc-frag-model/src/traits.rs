// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The parsing capability and what it hands back
//!
//! Fragment pipelines only see a parser through [`IfcParser`], so tests can swap
//! in a fake that produces deterministic fixtures.

use crate::{
    Bounds, EntityId, IfcType, LoaderSettings, LocalProperties, MeshData, ModelMetadata, Result,
};

/// Progress callback type for parsing operations
pub type ProgressCallback = Box<dyn Fn(&str, f32) + Send>;

/// One element that survived filtering, with its final mesh
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedElement {
    /// Entity ID of the element in the source file
    pub id: EntityId,
    /// Element category
    pub category: IfcType,
    /// World-space mesh (already normalized if requested)
    pub mesh: MeshData,
    /// RGBA color [r, g, b, a] where values are 0.0-1.0
    pub color: [f32; 4],
}

/// Parser output, convertible into a fragment group
#[derive(Clone, Debug, Default)]
pub struct ParsedModel {
    /// Header metadata
    pub metadata: ModelMetadata,
    /// Elements sorted by entity id
    pub elements: Vec<ParsedElement>,
    /// Local properties, `None` when the source carried no metadata or
    /// the settings asked not to retain it
    pub properties: Option<LocalProperties>,
    /// Translation already applied to every vertex by normalization
    pub coordination: [f64; 3],
    /// File units to meters
    pub unit_scale: f64,
}

impl ParsedModel {
    /// Bounds over every element mesh
    pub fn bounds(&self) -> Option<Bounds> {
        self.elements
            .iter()
            .filter_map(|e| e.mesh.bounds())
            .reduce(|a, b| a.union(&b))
    }

    /// Number of elements of a given category
    pub fn count_of(&self, category: &IfcType) -> usize {
        self.elements
            .iter()
            .filter(|e| &e.category == category)
            .count()
    }
}

/// Main parsing interface - entry point for parsing IFC content
///
/// Implementations must respect `settings` for the whole call: excluded
/// categories never reach `elements` or `properties`, and with
/// `normalize_coordinates` the returned geometry is recentered.
///
/// # Example
///
/// ```ignore
/// use ifc_frag_model::{IfcParser, LoaderSettings};
///
/// let parser: Box<dyn IfcParser> = get_parser();
/// let model = parser.parse(&bytes, &LoaderSettings::default())?;
/// println!("Schema: {}", model.metadata.schema_version);
/// ```
pub trait IfcParser: Send + Sync {
    /// Parse a complete model buffer
    ///
    /// # Arguments
    /// * `buffer` - The raw file content
    /// * `settings` - Filter policy snapshot for this parse
    ///
    /// # Returns
    /// A `ParsedModel` on success, or a `ParseError` on failure
    fn parse(&self, buffer: &[u8], settings: &LoaderSettings) -> Result<ParsedModel>;

    /// Parse with progress reporting
    ///
    /// # Arguments
    /// * `buffer` - The raw file content
    /// * `settings` - Filter policy snapshot for this parse
    /// * `on_progress` - Callback function receiving (phase_name, percent_complete)
    fn parse_with_progress(
        &self,
        buffer: &[u8],
        settings: &LoaderSettings,
        on_progress: ProgressCallback,
    ) -> Result<ParsedModel> {
        on_progress("parsing", 0.0);
        let model = self.parse(buffer, settings)?;
        on_progress("done", 100.0);
        Ok(model)
    }
}
