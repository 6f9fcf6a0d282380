// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synthetic IFC files for integration tests and benchmarks.
//!
//! Every element is a 1 m cube extruded from a square profile. Its base
//! center sits at the requested location, given in meters.

#![allow(dead_code)]

use std::fmt::Write;

pub struct Fixture {
    schema: String,
    millimetres: bool,
    elements: Vec<(String, [f64; 3])>,
    properties: bool,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            schema: "IFC4".to_string(),
            millimetres: false,
            elements: Vec::new(),
            properties: false,
        }
    }

    pub fn schema(mut self, schema: &str) -> Self {
        self.schema = schema.to_string();
        self
    }

    /// Author the file in millimetres
    pub fn millimetres(mut self) -> Self {
        self.millimetres = true;
        self
    }

    pub fn element(mut self, step_type: &str, at: [f64; 3]) -> Self {
        self.elements.push((step_type.to_string(), at));
        self
    }

    /// `count` elements two meters apart along X, starting at `origin`
    pub fn row(mut self, step_type: &str, count: usize, origin: [f64; 3]) -> Self {
        for i in 0..count {
            let at = [origin[0] + 2.0 * i as f64, origin[1], origin[2]];
            self.elements.push((step_type.to_string(), at));
        }
        self
    }

    /// Attach a property set and a quantity set to every element
    pub fn with_properties(mut self) -> Self {
        self.properties = true;
        self
    }

    pub fn build(&self) -> String {
        let unit = if self.millimetres { 1000.0 } else { 1.0 };
        let prefix = if self.millimetres { ".MILLI." } else { "$" };
        let real = |v: f64| format!("{:?}", v * unit);

        let mut out = String::new();
        out.push_str("ISO-10303-21;\nHEADER;\n");
        out.push_str("FILE_DESCRIPTION(('ViewDefinition [ReferenceView]'),'2;1');\n");
        out.push_str(
            "FILE_NAME('fixture.ifc','2024-01-01T00:00:00',('Tester'),('Lab'),'fixture','fixture','');\n",
        );
        let _ = writeln!(out, "FILE_SCHEMA(('{}'));", self.schema);
        out.push_str("ENDSEC;\nDATA;\n");

        let _ = writeln!(out, "#1=IFCPROJECT('0project',$,'Fixture',$,$,$,$,$,#2);");
        out.push_str("#2=IFCUNITASSIGNMENT((#3));\n");
        let _ = writeln!(out, "#3=IFCSIUNIT(*,.LENGTHUNIT.,{prefix},.METRE.);");
        out.push_str("#4=IFCCARTESIANPOINT((0.,0.,0.));\n");
        out.push_str("#5=IFCAXIS2PLACEMENT3D(#4,$,$);\n");
        out.push_str("#6=IFCLOCALPLACEMENT($,#5);\n");
        let _ = writeln!(
            out,
            "#7=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,{},{});",
            real(1.0),
            real(1.0)
        );
        out.push_str("#8=IFCDIRECTION((0.,0.,1.));\n");
        let _ = writeln!(out, "#9=IFCEXTRUDEDAREASOLID(#7,#5,#8,{});", real(1.0));
        out.push_str("#10=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#9));\n");
        out.push_str("#11=IFCPRODUCTDEFINITIONSHAPE($,$,(#10));\n");

        let mut next = 100u32;
        let mut element_ids = Vec::with_capacity(self.elements.len());
        for (i, (step_type, at)) in self.elements.iter().enumerate() {
            let (point, axes, placement, element) = (next, next + 1, next + 2, next + 3);
            next += 4;
            let _ = writeln!(
                out,
                "#{point}=IFCCARTESIANPOINT(({},{},{}));",
                real(at[0]),
                real(at[1]),
                real(at[2])
            );
            let _ = writeln!(out, "#{axes}=IFCAXIS2PLACEMENT3D(#{point},$,$);");
            let _ = writeln!(out, "#{placement}=IFCLOCALPLACEMENT(#6,#{axes});");
            let _ = writeln!(
                out,
                "#{element}={step_type}('guid{i}',$,'Element {i}',$,$,#{placement},#11,'T{i}',$);"
            );
            element_ids.push(element);
        }

        if self.properties && !element_ids.is_empty() {
            let related = element_ids
                .iter()
                .map(|id| format!("#{id}"))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(
                out,
                "#{}=IFCPROPERTYSINGLEVALUE('Reference',$,IFCIDENTIFIER('fixture'),$);",
                next
            );
            let _ = writeln!(
                out,
                "#{}=IFCPROPERTYSET('0pset',$,'Pset_Fixture',$,(#{}));",
                next + 1,
                next
            );
            let _ = writeln!(
                out,
                "#{}=IFCRELDEFINESBYPROPERTIES('0relp',$,$,$,({related}),#{});",
                next + 2,
                next + 1
            );
            let _ = writeln!(
                out,
                "#{}=IFCQUANTITYLENGTH('Height',$,$,{},$);",
                next + 3,
                real(1.0)
            );
            let _ = writeln!(
                out,
                "#{}=IFCELEMENTQUANTITY('0qset',$,'Qto_Fixture',$,$,(#{}));",
                next + 4,
                next + 3
            );
            let _ = writeln!(
                out,
                "#{}=IFCRELDEFINESBYPROPERTIES('0relq',$,$,$,({related}),#{});",
                next + 5,
                next + 4
            );
        }

        out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
        out
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.build().into_bytes()
    }
}
