// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Group export - a fragment stream plus an optional JSON property sidecar

use crate::codec;
use crate::error::{FragmentError, Result};
use crate::group::FragmentGroup;
use crate::registry::GroupRegistry;
use ifc_frag_model::LocalProperties;
use std::path::{Path, PathBuf};

/// Extension of the binary fragment file
pub const FRAGMENTS_EXTENSION: &str = "frag";
/// Extension of the property sidecar
pub const PROPERTIES_EXTENSION: &str = "json";

/// Export payloads for one group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Encoded fragment stream
    pub fragments: Vec<u8>,
    /// Local properties as JSON, `None` when the group has none
    pub properties: Option<Vec<u8>>,
}

impl ExportArtifact {
    /// Write `<stem>.frag` and, if present, `<stem>.json` into `dir`
    ///
    /// Returns the paths written.
    pub fn write_to(&self, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(2);

        let frag_path = dir.join(format!("{stem}.{FRAGMENTS_EXTENSION}"));
        std::fs::write(&frag_path, &self.fragments)?;
        written.push(frag_path);

        if let Some(properties) = &self.properties {
            let json_path = dir.join(format!("{stem}.{PROPERTIES_EXTENSION}"));
            std::fs::write(&json_path, properties)?;
            written.push(json_path);
        }

        Ok(written)
    }
}

/// Serializes registered groups
#[derive(Clone, Debug)]
pub struct Exporter {
    compress: bool,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter {
    /// Exporter with compressed fragment streams
    pub fn new() -> Self {
        Self { compress: true }
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Export one group. Read-only and repeatable.
    ///
    /// # Errors
    /// `InvalidState` if the group is not registered in `registry` or has
    /// been disposed.
    pub fn export(&self, registry: &GroupRegistry, group: &FragmentGroup) -> Result<ExportArtifact> {
        let id = group.id();
        if registry.get(id).as_ref() != Some(group) {
            return Err(FragmentError::invalid_state(format!(
                "group {id} is not registered"
            )));
        }

        let name = group.name();
        let artifact = group.read(|data| -> Result<ExportArtifact> {
            let fragments = codec::encode(data, &name, self.compress)?;
            let properties = data
                .properties
                .as_ref()
                .map(serde_json::to_vec_pretty)
                .transpose()?;
            Ok(ExportArtifact {
                fragments,
                properties,
            })
        })??;

        log::info!(
            "[Exporter] exported {id}: {} fragment bytes, {}",
            artifact.fragments.len(),
            artifact
                .properties
                .as_ref()
                .map_or_else(|| "no properties".to_string(), |p| format!("{} property bytes", p.len()))
        );
        Ok(artifact)
    }
}

/// Rebuild an unregistered group from a fragment stream and an optional
/// JSON property sidecar
///
/// The group gets a fresh id and the name it was exported under.
///
/// # Errors
/// `Codec` for a corrupt stream, `Json` for an unreadable sidecar.
pub fn import_group(fragments: &[u8], properties: Option<&[u8]>) -> Result<FragmentGroup> {
    let codec::DecodedGroup { name, mut data } = codec::decode(fragments)?;
    data.properties = properties
        .map(serde_json::from_slice::<LocalProperties>)
        .transpose()?;

    let group = FragmentGroup::new(data);
    group.set_name(name);
    Ok(group)
}
