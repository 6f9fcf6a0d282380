// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `convert` - read an IFC file, load it and write the export payloads

use anyhow::{Context, Result};
use clap::Args;
use ifc_frag_model::{IfcType, LoaderSettings};
use ifc_frag_parser::StepParser;
use ifc_fragments::{FragmentsConfig, FragmentsManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// IFC file to convert
    pub input: PathBuf,

    /// Directory for the output files (defaults to the input's directory)
    #[arg(long, short)]
    pub out_dir: Option<PathBuf>,

    /// Element category to skip, e.g. IfcFurnishingElement (repeatable)
    #[arg(long, value_name = "CATEGORY")]
    pub exclude: Vec<String>,

    /// Skip bars, meshes, tendons and tendon anchors
    #[arg(long)]
    pub exclude_reinforcement: bool,

    /// Keep the original coordinates instead of centering the model
    #[arg(long)]
    pub keep_coordinates: bool,

    /// Do not write the property sidecar
    #[arg(long)]
    pub no_properties: bool,

    /// Give up on loads that take longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl ConvertArgs {
    /// Apply the flags on top of environment defaults
    pub fn apply(&self, mut config: FragmentsConfig) -> FragmentsConfig {
        let settings = &mut config.settings;
        for name in &self.exclude {
            let category = IfcType::parse(name.trim());
            if !category.is_element() {
                log::warn!("{name} is not an element category, nothing will match it");
            }
            settings.exclude(category);
        }
        if self.exclude_reinforcement {
            for category in LoaderSettings::REINFORCEMENT {
                settings.exclude(category);
            }
        }
        if self.keep_coordinates {
            settings.set_normalize_coordinates(false);
        }
        if self.no_properties {
            settings.set_include_properties(false);
        }
        if let Some(secs) = self.timeout {
            config.load_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config
    }

    fn stem(&self) -> Result<String> {
        self.input
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .with_context(|| format!("no file name in {}", self.input.display()))
    }

    fn out_dir(&self) -> PathBuf {
        match &self.out_dir {
            Some(dir) => dir.clone(),
            None => self
                .input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }
}

/// Convert with defaults taken from the environment
pub async fn run(args: &ConvertArgs) -> Result<Vec<PathBuf>> {
    run_with(args, FragmentsConfig::from_env()).await
}

/// Load, export and dispose one model; returns the files written
pub async fn run_with(args: &ConvertArgs, base: FragmentsConfig) -> Result<Vec<PathBuf>> {
    let stem = args.stem()?;
    let out_dir = args.out_dir();
    let buffer = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let mut manager = FragmentsManager::new(Arc::new(StepParser::new()), args.apply(base));
    let group = manager
        .load_and_register(buffer, &stem)
        .await
        .with_context(|| format!("failed to load {}", args.input.display()))?;

    let artifact = manager.export(&group)?;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let written = artifact
        .write_to(&out_dir, &stem)
        .with_context(|| format!("failed to write into {}", out_dir.display()))?;

    log::info!(
        "Converted {} elements from {} ({} bytes of fragments)",
        group.element_count()?,
        args.input.display(),
        artifact.fragments.len()
    );
    manager.dispose_all();
    Ok(written)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const WALLS_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [ReferenceView]'),'2;1');
FILE_NAME('walls.ifc','2024-03-01T12:00:00',('Author'),('Org'),'exporter','Modeler','');
FILE_SCHEMA(('IFC2X3'));
ENDSEC;
DATA;
#1=IFCPROJECT('0p',$,'Walls',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3));
#3=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);
#10=IFCCARTESIANPOINT((0.,0.,0.));
#11=IFCAXIS2PLACEMENT3D(#10,$,$);
#12=IFCLOCALPLACEMENT($,#11);
#13=IFCCARTESIANPOINT((6.,0.,0.));
#14=IFCAXIS2PLACEMENT3D(#13,$,$);
#15=IFCLOCALPLACEMENT($,#14);
#20=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,4.,0.2);
#21=IFCDIRECTION((0.,0.,1.));
#22=IFCEXTRUDEDAREASOLID(#20,#11,#21,2.5);
#23=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#22));
#24=IFCPRODUCTDEFINITIONSHAPE($,$,(#23));
#30=IFCWALL('1w',$,'W1',$,$,#12,#24,$);
#31=IFCSLAB('1s',$,'S1',$,$,#15,#24,$,.FLOOR.);
#40=IFCPROPERTYSINGLEVALUE('LoadBearing',$,IFCBOOLEAN(.F.),$);
#41=IFCPROPERTYSET('1p',$,'Pset_WallCommon',$,(#40));
#42=IFCRELDEFINESBYPROPERTIES('1r',$,$,$,(#30),#41);
ENDSEC;
END-ISO-10303-21;
"#;

    pub(crate) fn args(input: PathBuf) -> ConvertArgs {
        ConvertArgs {
            input,
            out_dir: None,
            exclude: Vec::new(),
            exclude_reinforcement: false,
            keep_coordinates: false,
            no_properties: false,
            timeout: None,
        }
    }

    pub(crate) fn write_input(dir: &Path) -> PathBuf {
        let input = dir.join("walls.ifc");
        std::fs::write(&input, WALLS_IFC).unwrap();
        input
    }

    #[test]
    fn flags_override_defaults() {
        let mut args = args(PathBuf::from("a.ifc"));
        args.exclude = vec!["IfcSlab".into()];
        args.exclude_reinforcement = true;
        args.keep_coordinates = true;
        args.no_properties = true;
        args.timeout = Some(0);

        let base = FragmentsConfig::default().with_load_timeout(Some(Duration::from_secs(5)));
        let config = args.apply(base);
        assert!(config.settings.is_excluded(&IfcType::IfcSlab));
        assert!(config.settings.is_excluded(&IfcType::IfcTendon));
        assert!(!config.settings.normalize_coordinates);
        assert!(!config.settings.include_properties);
        assert_eq!(config.load_timeout, None);
    }

    #[test]
    fn output_defaults_next_to_input() {
        let args = args(PathBuf::from("models/tower.v2.ifc"));
        assert_eq!(args.stem().unwrap(), "tower.v2");
        assert_eq!(args.out_dir(), PathBuf::from("models"));
    }

    #[tokio::test]
    async fn writes_fragments_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(write_input(dir.path()));
        args.out_dir = Some(dir.path().join("out"));

        let written = run_with(&args, FragmentsConfig::default()).await.unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("out/walls.frag"),
                dir.path().join("out/walls.json"),
            ]
        );
        for path in &written {
            assert!(std::fs::metadata(path).unwrap().len() > 0);
        }
    }

    #[tokio::test]
    async fn sidecar_is_skipped_without_properties() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(write_input(dir.path()));
        args.no_properties = true;

        let written = run_with(&args, FragmentsConfig::default()).await.unwrap();
        assert_eq!(written, vec![dir.path().join("walls.frag")]);
    }

    #[tokio::test]
    async fn missing_input_is_reported() {
        let args = args(PathBuf::from("/nonexistent/dir/model.ifc"));
        let err = run_with(&args, FragmentsConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
