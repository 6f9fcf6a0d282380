// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The full pipeline on a real STEP file.

use ifc_frag_model::IfcType;
use ifc_frag_parser::StepParser;
use ifc_fragments::{codec, FragmentError, FragmentsConfig, FragmentsManager};
use std::sync::Arc;

const SITE_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [ReferenceView]'),'2;1');
FILE_NAME('site.ifc','2024-05-01T09:30:00',('Engineer'),('Office'),'exporter 1.0','Modeler','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('0YvctVUKr0kugbFTf53O9L',$,'Site',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3));
#3=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);
#10=IFCCARTESIANPOINT((0.,0.,0.));
#11=IFCAXIS2PLACEMENT3D(#10,$,$);
#12=IFCLOCALPLACEMENT($,#11);
#13=IFCCARTESIANPOINT((2500000.,1200000.,300000.));
#14=IFCAXIS2PLACEMENT3D(#13,$,$);
#15=IFCLOCALPLACEMENT(#12,#14);
#16=IFCCARTESIANPOINT((4000.,0.,0.));
#17=IFCAXIS2PLACEMENT3D(#16,$,$);
#18=IFCLOCALPLACEMENT(#15,#17);
#20=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,400.,400.);
#21=IFCDIRECTION((0.,0.,1.));
#22=IFCEXTRUDEDAREASOLID(#20,#11,#21,3000.);
#23=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#22));
#24=IFCPRODUCTDEFINITIONSHAPE($,$,(#23));
#25=IFCCIRCLEPROFILEDEF(.AREA.,$,$,10.);
#26=IFCEXTRUDEDAREASOLID(#25,#11,#21,3000.);
#27=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#26));
#28=IFCPRODUCTDEFINITIONSHAPE($,$,(#27));
#30=IFCCOLUMN('2O2Fr$t4X7Zf8NOew3FLOH',$,'C1',$,$,#15,#24,'C1',.COLUMN.);
#31=IFCCOLUMN('2O2Fr$t4X7Zf8NOew3FLOI',$,'C2',$,$,#18,#24,'C2',.COLUMN.);
#32=IFCREINFORCINGBAR('3O2Fr$t4X7Zf8NOew3FLOJ',$,'Bar',$,$,#15,#28,$,$,20.,314.,3000.,.MAIN.,.PLAIN.);
#40=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#41=IFCPROPERTYSET('1pset',$,'Pset_ColumnCommon',$,(#40));
#42=IFCRELDEFINESBYPROPERTIES('1rel',$,$,$,(#30,#31,#32),#41);
ENDSEC;
END-ISO-10303-21;
"#;

fn manager() -> FragmentsManager {
    FragmentsManager::new(
        Arc::new(StepParser::new()),
        FragmentsConfig::default(),
    )
}

#[tokio::test]
async fn step_file_to_fragments_and_back() {
    let mut manager = manager();
    manager.settings_mut().exclude(IfcType::IfcReinforcingBar);

    let group = manager
        .load_and_register(SITE_IFC.as_bytes(), "site")
        .await
        .unwrap();
    assert_eq!(group.element_count().unwrap(), 2);
    assert_eq!(group.metadata().unwrap().schema_version, "IFC4");

    // Two columns 4 m apart around the origin after normalization
    let bounds = group.bounds().unwrap().unwrap();
    let size = bounds.size();
    assert!((size[0] - 4.4).abs() < 1e-3, "size {size:?}");
    assert!((size[2] - 3.0).abs() < 1e-3, "size {size:?}");
    for c in bounds.center() {
        assert!(c.abs() < 1e-3);
    }
    let coordination = group.coordination().unwrap();
    assert!((coordination[0] + 2502.0).abs() < 1e-6, "{coordination:?}");

    let artifact = manager.export(&group).unwrap();
    let info = codec::peek(&artifact.fragments).unwrap();
    assert_eq!(info.element_count, 2);
    assert!(info.compressed);

    let json: serde_json::Value =
        serde_json::from_slice(artifact.properties.as_ref().unwrap()).unwrap();
    assert_eq!(json["30"]["name"], "C1");
    assert!(json.get("32").is_none());

    let imported = manager
        .import(&artifact.fragments, artifact.properties.as_deref())
        .unwrap();
    assert_eq!(imported.name(), "site");
    assert_eq!(
        imported.metadata().unwrap().file_name.as_deref(),
        Some("site.ifc")
    );
    assert!(imported
        .bounds()
        .unwrap()
        .unwrap()
        .approx_eq(&bounds, 1e-6));

    assert_eq!(manager.dispose_all(), 2);
    assert!(matches!(
        manager.export(&imported),
        Err(FragmentError::InvalidState(_))
    ));
}

#[tokio::test]
async fn truncated_step_file_is_a_parse_error() {
    let mut manager = manager();
    let cut = &SITE_IFC.as_bytes()[..SITE_IFC.len() / 3];
    let err = manager.load_and_register(cut, "cut").await.unwrap_err();
    assert!(matches!(err, FragmentError::Parse(_)));
    assert!(manager.is_empty());
}
