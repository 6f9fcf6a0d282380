// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Fragments - load models into fragment groups, export and dispose them
//!
//! The pipeline around a parsing capability:
//!
//! - [`Loader`] - runs an [`IfcParser`](ifc_frag_model::IfcParser) off the async
//!   runtime with a snapshot of the [`LoaderSettings`](ifc_frag_model::LoaderSettings)
//! - [`GroupRegistry`] - the set of live [`FragmentGroup`]s
//! - [`Exporter`] - compact binary fragment stream plus JSON property sidecar
//! - [`disposer`] - releases group memory and clears the registry
//! - [`FragmentsManager`] - application context with load tickets and events
//!
//! # Example
//!
//! ```ignore
//! use ifc_fragments::{FragmentsConfig, FragmentsManager};
//! use ifc_frag_model::IfcType;
//! use std::sync::Arc;
//!
//! let mut manager = FragmentsManager::new(Arc::new(StepParser::new()), FragmentsConfig::default());
//! manager.settings_mut().exclude(IfcType::IfcReinforcingBar);
//!
//! let group = manager.load_and_register(bytes, "tower").await?;
//! let artifact = manager.export(&group)?;
//! artifact.write_to(out_dir, "tower")?;
//! manager.dispose_all();
//! ```

pub mod codec;
pub mod config;
pub mod disposer;
pub mod error;
pub mod events;
pub mod exporter;
pub mod group;
pub mod loader;
pub mod manager;
pub mod registry;

pub use config::FragmentsConfig;
pub use error::{FragmentError, Result};
pub use events::{EventBus, FragmentEvent};
pub use exporter::{import_group, ExportArtifact, Exporter};
pub use group::{FragmentGroup, GroupData, GroupId};
pub use loader::Loader;
pub use manager::{FragmentsManager, LoadTicket, PendingGroup};
pub use registry::GroupRegistry;
