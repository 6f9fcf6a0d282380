// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Frag Parser - STEP/IFC parsing capability for fragment pipelines
//!
//! This crate turns a raw IFC (STEP) buffer into the [`ParsedModel`] that
//! `ifc-frag-model` defines, applying the caller's [`LoaderSettings`] on the way.
//!
//! # Features
//!
//! - **Fast tokenization** using `nom` combinators
//! - **SIMD-accelerated scanning** using `memchr`
//! - **Lazy entity decoding** with an `Arc` cache shared across threads
//! - **Category filtering** before any geometry is built
//! - **Parallel geometry** using `rayon`
//! - **Coordinate normalization** in double precision
//! - **Progress reporting** for large files
//!
//! # Example
//!
//! ```ignore
//! use ifc_frag_parser::StepParser;
//! use ifc_frag_model::{IfcParser, IfcType, LoaderSettings};
//!
//! let settings = LoaderSettings::new().excluding(IfcType::IfcReinforcingBar);
//! let model = StepParser::new().parse(&bytes, &settings)?;
//! println!("{} elements", model.elements.len());
//! ```

pub mod geometry;
mod model;
pub mod properties;
pub mod resolver;
pub mod scanner;
pub mod tokenizer;
pub mod units;

pub use resolver::{EntityResolver, StepResolver};
pub use scanner::EntityScanner;
pub use tokenizer::{parse_entity, Token};

use ifc_frag_model::{IfcParser, LoaderSettings, ParsedModel, ProgressCallback, Result};
use model::BuildOptions;

/// Main STEP/IFC parser implementing the `IfcParser` trait
#[derive(Clone, Debug)]
pub struct StepParser {
    /// Whether to extract local properties during parsing
    pub extract_properties: bool,
    /// Whether to build element meshes on the rayon pool
    pub parallel_geometry: bool,
}

impl Default for StepParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StepParser {
    /// Create a new parser with default settings
    pub fn new() -> Self {
        Self {
            extract_properties: true,
            parallel_geometry: true,
        }
    }

    /// Create a parser that only builds geometry
    pub fn geometry_only() -> Self {
        Self {
            extract_properties: false,
            ..Self::new()
        }
    }

    /// Set whether to extract properties
    pub fn with_properties(mut self, enabled: bool) -> Self {
        self.extract_properties = enabled;
        self
    }

    /// Set whether geometry is built in parallel
    pub fn with_parallel_geometry(mut self, enabled: bool) -> Self {
        self.parallel_geometry = enabled;
        self
    }

    fn options(&self) -> BuildOptions {
        BuildOptions {
            extract_properties: self.extract_properties,
            parallel_geometry: self.parallel_geometry,
        }
    }
}

impl IfcParser for StepParser {
    fn parse(&self, buffer: &[u8], settings: &LoaderSettings) -> Result<ParsedModel> {
        model::build(buffer, settings, &self.options(), &no_progress)
    }

    fn parse_with_progress(
        &self,
        buffer: &[u8],
        settings: &LoaderSettings,
        on_progress: ProgressCallback,
    ) -> Result<ParsedModel> {
        model::build(buffer, settings, &self.options(), on_progress.as_ref())
    }
}

fn no_progress(_phase: &str, _percent: f32) {}

/// Quick parse function for simple use cases
pub fn parse(buffer: &[u8], settings: &LoaderSettings) -> Result<ParsedModel> {
    StepParser::new().parse(buffer, settings)
}

/// Parse with progress reporting
pub fn parse_with_progress(
    buffer: &[u8],
    settings: &LoaderSettings,
    on_progress: impl Fn(&str, f32) + Send + 'static,
) -> Result<ParsedModel> {
    StepParser::new().parse_with_progress(buffer, settings, Box::new(on_progress))
}
