// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Frag Model - Shared types and the parser contract for fragment pipelines
//!
//! This crate holds everything the ingestion side and the fragment side agree on:
//! entity and category types, the loader settings that decide which elements
//! survive an import, the mesh and property records a parser hands back, and the
//! [`IfcParser`] trait itself.
//!
//! # Architecture
//!
//! - [`LoaderSettings`] - Category exclusions and coordinate normalization
//! - [`IfcParser`] - Turns a raw model buffer into a [`ParsedModel`]
//! - [`ParsedModel`] / [`ParsedElement`] - Per-element meshes plus optional local properties
//! - [`ParseError`] - Everything that can go wrong while parsing
//!
//! # Example
//!
//! ```ignore
//! use ifc_frag_model::{IfcParser, IfcType, LoaderSettings};
//!
//! let mut settings = LoaderSettings::default();
//! settings.exclude(IfcType::IfcReinforcingBar);
//!
//! let parser: Box<dyn IfcParser> = get_parser();
//! let model = parser.parse(&buffer, &settings)?;
//! println!("{} elements", model.elements.len());
//! ```

pub mod error;
pub mod geometry;
pub mod properties;
pub mod settings;
pub mod traits;
pub mod types;

// Re-export all public types
pub use error::*;
pub use geometry::*;
pub use properties::*;
pub use settings::*;
pub use traits::*;
pub use types::*;
