// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model building - from raw bytes to filtered, placed, normalized elements

use crate::geometry::{GeometryRouter, Mesh};
use crate::properties::StepPropertyReader;
use crate::resolver::{EntityResolver, StepResolver};
use crate::scanner::{check_envelope, parse_header, HeaderInfo};
use crate::units::extract_unit_scale;

use ifc_frag_model::{
    get_default_color, Bounds, ElementProperties, EntityId, IfcType, LoaderSettings,
    LocalProperties, ModelMetadata, ParseError, ParsedElement, ParsedModel, Result,
};
use rayon::prelude::*;
use std::borrow::Cow;
use std::time::Instant;

/// Schemas whose entity layout the resolver and processors understand
const SUPPORTED_SCHEMAS: [&str; 2] = ["IFC2X3", "IFC4"];

/// Options that are not part of the loader settings
pub(crate) struct BuildOptions {
    pub extract_properties: bool,
    pub parallel_geometry: bool,
}

/// Parse `buffer` under `settings`, reporting phases through `on_progress`
pub(crate) fn build(
    buffer: &[u8],
    settings: &LoaderSettings,
    options: &BuildOptions,
    on_progress: &dyn Fn(&str, f32),
) -> Result<ParsedModel> {
    let start = Instant::now();
    on_progress("Scanning entities", 0.0);

    // Older exporters write Latin-1 names; stray bytes only affect strings
    let content = String::from_utf8_lossy(buffer);
    if matches!(content, Cow::Owned(_)) {
        log::warn!("[Parser] file is not valid UTF-8, replacing invalid bytes");
    }
    check_envelope(&content)?;

    let header = parse_header(&content);
    check_schema(&header.schema_version)?;

    let resolver = StepResolver::new(&content);
    log::info!(
        "[Parser] {} entities, schema {}",
        resolver.entity_count(),
        header.schema_version
    );
    on_progress("Building index", 20.0);

    let unit_scale = extract_unit_scale(&resolver)?;
    on_progress("Extracting units", 40.0);

    let element_ids = select_elements(&resolver, settings);
    on_progress("Processing geometry", 50.0);

    let router = GeometryRouter::with_default_processors().with_unit_scale(unit_scale);
    let meshes = build_meshes(&router, &resolver, &element_ids, options.parallel_geometry)?;
    on_progress("Normalizing coordinates", 80.0);

    let coordination = if settings.normalize_coordinates {
        normalization_offset(&meshes)
    } else {
        [0.0; 3]
    };
    if coordination != [0.0; 3] {
        log::info!(
            "[Parser] normalized by ({:.3}, {:.3}, {:.3})",
            coordination[0],
            coordination[1],
            coordination[2]
        );
    }

    let elements: Vec<ParsedElement> = meshes
        .iter()
        .map(|(id, category, mesh)| ParsedElement {
            id: *id,
            category: category.clone(),
            mesh: mesh.to_mesh_data(coordination),
            color: get_default_color(category),
        })
        .collect();
    on_progress("Extracting properties", 90.0);

    let properties = if options.extract_properties && settings.include_properties {
        extract_properties(&resolver, &element_ids)?
    } else {
        None
    };

    log::info!(
        "[Parser] {} elements with geometry, {} properties in {:.1}ms",
        elements.len(),
        properties.as_ref().map_or(0, |p| p.len()),
        start.elapsed().as_secs_f64() * 1000.0
    );
    on_progress("Complete", 100.0);

    Ok(ParsedModel {
        metadata: metadata_from(header),
        elements,
        properties,
        coordination,
        unit_scale,
    })
}

/// Reject files whose schema we cannot interpret
fn check_schema(schema: &str) -> Result<()> {
    if schema.is_empty() {
        return Err(ParseError::header("missing FILE_SCHEMA"));
    }
    let upper = schema.to_ascii_uppercase();
    if SUPPORTED_SCHEMAS.iter().any(|s| upper.starts_with(s)) {
        Ok(())
    } else {
        Err(ParseError::UnsupportedSchema(schema.to_string()))
    }
}

/// Every element entity whose category survives the filter, sorted by id
fn select_elements(resolver: &dyn EntityResolver, settings: &LoaderSettings) -> Vec<(EntityId, IfcType)> {
    let mut excluded = 0usize;
    let mut selected = Vec::new();

    for (ifc_type, ids) in resolver.types() {
        if !ifc_type.is_element() {
            continue;
        }
        if settings.is_excluded(ifc_type) {
            excluded += ids.len();
            continue;
        }
        selected.extend(ids.iter().map(|id| (*id, ifc_type.clone())));
    }

    if excluded > 0 {
        log::info!(
            "[Parser] excluded {excluded} elements ({})",
            settings.excluded_names().join(", ")
        );
    }
    selected.sort_unstable_by_key(|(id, _)| *id);
    selected
}

type ElementMesh = (EntityId, IfcType, Mesh);

/// Meshes for every element with a body, in id order
///
/// Geometry failures only drop the element; a broken file aborts the parse.
fn build_meshes(
    router: &GeometryRouter,
    resolver: &dyn EntityResolver,
    elements: &[(EntityId, IfcType)],
    parallel: bool,
) -> Result<Vec<ElementMesh>> {
    let process = |(id, category): &(EntityId, IfcType)| -> Result<Option<ElementMesh>> {
        let Some(entity) = resolver.get(*id)? else {
            return Ok(None);
        };
        match router.process_element(&entity, resolver) {
            Ok(mesh) if mesh.is_empty() => Ok(None),
            Ok(mesh) => Ok(Some((*id, category.clone(), mesh))),
            Err(e) if e.is_fatal() => Err(e.into_parse_error(*id)),
            Err(e) => {
                log::warn!("[Parser] skipping {id} ({category}): {e}");
                Ok(None)
            }
        }
    };

    let results: Vec<Result<Option<ElementMesh>>> = if parallel {
        elements.par_iter().map(process).collect()
    } else {
        elements.iter().map(process).collect()
    };

    let mut meshes = Vec::with_capacity(results.len());
    for result in results {
        if let Some(mesh) = result? {
            meshes.push(mesh);
        }
    }
    Ok(meshes)
}

/// Translation that moves the combined bounding-box center to the origin
fn normalization_offset(meshes: &[ElementMesh]) -> [f64; 3] {
    let bounds = meshes
        .iter()
        .filter_map(|(_, _, mesh)| mesh.bounds())
        .reduce(|a, b| a.union(&b));
    match bounds.as_ref().map(Bounds::center) {
        Some([x, y, z]) => [-x, -y, -z],
        None => [0.0; 3],
    }
}

/// Local properties of all selected elements, `None` if the file has no
/// property or quantity definitions at all
fn extract_properties(
    resolver: &dyn EntityResolver,
    elements: &[(EntityId, IfcType)],
) -> Result<Option<LocalProperties>> {
    let reader = StepPropertyReader::new(resolver)?;
    if !reader.has_definitions() {
        return Ok(None);
    }

    let properties: LocalProperties = elements
        .iter()
        .map(|(id, category)| {
            (
                id.0,
                ElementProperties::from_reader(&reader, *id, category.clone()),
            )
        })
        .collect();
    Ok(Some(properties))
}

fn metadata_from(header: HeaderInfo) -> ModelMetadata {
    ModelMetadata {
        schema_version: header.schema_version,
        originating_system: header.originating_system,
        preprocessor_version: header.preprocessor_version,
        file_name: header.file_name,
        author: header.author,
        organization: header.organization,
        timestamp: header.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    const TEST_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [ReferenceView]'),'2;1');
FILE_NAME('tower.ifc','2024-01-01T00:00:00',('Author'),('Org'),'Preprocessor','App','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('0p',$,'Tower',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3));
#3=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);
#10=IFCCARTESIANPOINT((0.,0.,0.));
#11=IFCAXIS2PLACEMENT3D(#10,$,$);
#12=IFCLOCALPLACEMENT($,#11);
#13=IFCCARTESIANPOINT((10000000.,0.,5000000.));
#14=IFCAXIS2PLACEMENT3D(#13,$,$);
#15=IFCLOCALPLACEMENT(#12,#14);
#20=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,1000.,1000.);
#21=IFCDIRECTION((0.,0.,1.));
#22=IFCEXTRUDEDAREASOLID(#20,#11,#21,2000.);
#23=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#22));
#24=IFCPRODUCTDEFINITIONSHAPE($,$,(#23));
#30=IFCCOLUMN('1c',$,'C1',$,$,#15,#24,$,$);
#31=IFCREINFORCINGBAR('1r',$,'R1',$,$,#15,#24,$,$,$,$,$,$,$,$);
#32=IFCWALL('1w',$,'W1',$,$,#15,$,$,$);
#40=IFCPROPERTYSINGLEVALUE('LoadBearing',$,IFCBOOLEAN(.T.),$);
#41=IFCPROPERTYSET('2p',$,'Pset_ColumnCommon',$,(#40));
#42=IFCRELDEFINESBYPROPERTIES('3r',$,$,$,(#30,#31),#41);
ENDSEC;
END-ISO-10303-21;
"#;

    fn options() -> BuildOptions {
        BuildOptions {
            extract_properties: true,
            parallel_geometry: false,
        }
    }

    fn quiet(_: &str, _: f32) {}

    #[test]
    fn test_build_filters_and_normalizes() {
        let settings = LoaderSettings::new().excluding(IfcType::IfcReinforcingBar);
        let model = build(TEST_IFC.as_bytes(), &settings, &options(), &quiet).unwrap();

        assert_eq!(model.metadata.schema_version, "IFC4");
        assert_relative_eq!(model.unit_scale, 0.001);
        assert_eq!(model.elements.len(), 1);
        assert_eq!(model.elements[0].category, IfcType::IfcColumn);

        // Column center at (10000, 0, 5001) m before normalization
        assert_relative_eq!(model.coordination[0], -10000.0, epsilon = 1e-6);
        assert_relative_eq!(model.coordination[2], -5001.0, epsilon = 1e-6);
        let center = model.bounds().unwrap().center();
        for c in center {
            assert!(c.abs() < 1e-3, "center {center:?} not at origin");
        }

        let properties = model.properties.unwrap();
        assert!(properties.contains_key(&30));
        assert!(properties.contains_key(&32));
        assert!(!properties.contains_key(&31));
        assert_eq!(
            properties[&30].property("LoadBearing").map(|p| p.value.as_str()),
            Some("true")
        );
    }

    #[test]
    fn test_build_keeps_coordinates_when_asked() {
        let settings = LoaderSettings::new().with_normalize_coordinates(false);
        let model = build(TEST_IFC.as_bytes(), &settings, &options(), &quiet).unwrap();

        assert_eq!(model.coordination, [0.0; 3]);
        assert_eq!(model.elements.len(), 2);
        let bounds = model.bounds().unwrap();
        assert_relative_eq!(bounds.min[0], 9999.5, epsilon = 1e-2);
        assert_relative_eq!(bounds.max[2], 5002.0, epsilon = 1e-2);
    }

    #[test]
    fn test_build_without_properties() {
        let settings = LoaderSettings::new().with_properties(false);
        let model = build(TEST_IFC.as_bytes(), &settings, &options(), &quiet).unwrap();
        assert!(model.properties.is_none());

        let no_extract = BuildOptions {
            extract_properties: false,
            parallel_geometry: true,
        };
        let model = build(TEST_IFC.as_bytes(), &LoaderSettings::new(), &no_extract, &quiet).unwrap();
        assert!(model.properties.is_none());
        assert_eq!(model.elements.len(), 2);
    }

    #[test]
    fn test_schema_checks() {
        assert!(check_schema("IFC2X3").is_ok());
        assert!(check_schema("IFC4X3_ADD2").is_ok());
        assert!(matches!(check_schema(""), Err(ParseError::InvalidHeader(_))));
        assert!(matches!(
            check_schema("AP214"),
            Err(ParseError::UnsupportedSchema(_))
        ));
    }

    #[test]
    fn test_progress_phases() {
        let phases = Mutex::new(Vec::new());
        let record = |phase: &str, pct: f32| phases.lock().unwrap().push((phase.to_string(), pct));
        build(TEST_IFC.as_bytes(), &LoaderSettings::new(), &options(), &record).unwrap();

        let phases = phases.into_inner().unwrap();
        assert_eq!(phases.first().unwrap().0, "Scanning entities");
        assert_eq!(phases.last().unwrap(), &("Complete".to_string(), 100.0));
        assert!(phases.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_latin1_names_do_not_reject_the_file() {
        let (head, tail) = TEST_IFC.split_once("'C1'").unwrap();
        let mut bytes = head.as_bytes().to_vec();
        bytes.extend_from_slice(b"'W\xe4nde'");
        bytes.extend_from_slice(tail.as_bytes());
        assert!(std::str::from_utf8(&bytes).is_err());

        let settings = LoaderSettings::new().excluding(IfcType::IfcReinforcingBar);
        let model = build(&bytes, &settings, &options(), &quiet).unwrap();
        assert_eq!(model.elements.len(), 1);
        let name = model.properties.unwrap()[&30].name.clone().unwrap();
        assert_eq!(name, "W\u{FFFD}nde");
    }

    #[test]
    fn test_truncated_buffer() {
        let cut = &TEST_IFC.as_bytes()[..TEST_IFC.len() / 2];
        let err = build(cut, &LoaderSettings::new(), &options(), &quiet).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));
    }
}
