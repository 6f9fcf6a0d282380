// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `inspect` - import an exported fragment file and summarize it

use anyhow::{Context, Result};
use clap::Args;
use ifc_fragments::{codec, disposer, import_group, GroupRegistry};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Fragment file written by `convert`
    pub fragments: PathBuf,

    /// Property sidecar to import alongside
    #[arg(long, short)]
    pub properties: Option<PathBuf>,
}

/// What `inspect` prints
#[derive(Debug)]
pub struct Summary {
    pub name: String,
    pub schema: String,
    pub version: u32,
    pub compressed: bool,
    pub stream_bytes: usize,
    pub elements: usize,
    pub triangles: usize,
    pub categories: BTreeMap<String, usize>,
    pub size: Option<[f64; 3]>,
    pub coordination: [f64; 3],
    pub with_properties: usize,
}

pub fn run(args: &InspectArgs) -> Result<Summary> {
    let fragments = std::fs::read(&args.fragments)
        .with_context(|| format!("failed to read {}", args.fragments.display()))?;
    let properties = args
        .properties
        .as_ref()
        .map(|path| {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        })
        .transpose()?;

    let info = codec::peek(&fragments)
        .with_context(|| format!("{} is not a fragment file", args.fragments.display()))?;

    let group = import_group(&fragments, properties.as_deref())?;
    let mut registry = GroupRegistry::new();
    registry.register(group.clone())?;

    let summary = group.read(|data| {
        let mut categories = BTreeMap::new();
        for fragment in &data.fragments {
            *categories
                .entry(fragment.category.name().to_string())
                .or_insert(0) += 1;
        }
        Summary {
            name: group.name(),
            schema: data.metadata.schema_version.clone(),
            version: info.version,
            compressed: info.compressed,
            stream_bytes: fragments.len(),
            elements: data.fragments.len(),
            triangles: data.triangle_count(),
            categories,
            size: data.bounds().map(|b| b.size()),
            coordination: data.coordination,
            with_properties: data.properties.as_ref().map_or(0, |p| p.len()),
        }
    })?;

    disposer::dispose_all(&mut registry);
    Ok(summary)
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name:        {}", self.name)?;
        writeln!(f, "schema:      {}", self.schema)?;
        writeln!(
            f,
            "stream:      v{}, {} bytes{}",
            self.version,
            self.stream_bytes,
            if self.compressed { ", zlib" } else { "" }
        )?;
        writeln!(f, "elements:    {}", self.elements)?;
        writeln!(f, "triangles:   {}", self.triangles)?;
        if let Some([x, y, z]) = self.size {
            writeln!(f, "size:        {x:.3} x {y:.3} x {z:.3} m")?;
        }
        let [cx, cy, cz] = self.coordination;
        writeln!(f, "offset:      ({cx:.3}, {cy:.3}, {cz:.3})")?;
        writeln!(f, "properties:  {} elements", self.with_properties)?;
        for (category, count) in &self.categories {
            writeln!(f, "  {category:<28} {count}")?;
        }
        Ok(())
    }
}
