// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Load, register, export, import and dispose against a fake parser.
//!
//! The fake reads a line format instead of STEP:
//!
//! ```text
//! FAKE v1
//! META                  (optional: attach properties)
//! SLEEP 200             (optional: block for 200ms)
//! IFCWALL 1.0 2.0 3.0   (one element per line)
//! END
//! ```

use approx::assert_relative_eq;
use ifc_frag_model::{
    get_default_color, Bounds, ElementProperties, EntityId, IfcParser, IfcType, LoaderSettings,
    LocalProperties, MeshData, ParseError, ParsedElement, ParsedModel, Property, PropertySet,
    Result as ParseResult,
};
use ifc_fragments::{FragmentError, FragmentEvent, FragmentsConfig, FragmentsManager};
use std::sync::Arc;
use std::time::Duration;

struct FakeParser;

impl IfcParser for FakeParser {
    fn parse(&self, buffer: &[u8], settings: &LoaderSettings) -> ParseResult<ParsedModel> {
        let text = std::str::from_utf8(buffer).map_err(|_| ParseError::format("not text"))?;
        let mut lines = text.lines();
        match lines.next() {
            Some("FAKE v1") => {}
            Some(other) if other.starts_with("FAKE ") => {
                return Err(ParseError::UnsupportedSchema(other[5..].to_string()))
            }
            _ => return Err(ParseError::format("missing FAKE header")),
        }

        let mut with_meta = false;
        let mut ended = false;
        let mut found = Vec::new();
        for (n, line) in lines.enumerate() {
            match line.split_whitespace().collect::<Vec<_>>().as_slice() {
                ["END"] => ended = true,
                ["META"] => with_meta = true,
                ["SLEEP", ms] => std::thread::sleep(Duration::from_millis(ms.parse().unwrap_or(0))),
                [ty, x, y, z] => {
                    let coord = |s: &str| {
                        s.parse::<f64>()
                            .map_err(|_| ParseError::format(format!("line {}: bad number", n + 2)))
                    };
                    found.push((
                        EntityId(n as u32 + 2),
                        IfcType::parse(ty),
                        [coord(*x)?, coord(*y)?, coord(*z)?],
                    ));
                }
                _ => return Err(ParseError::format(format!("line {}: unreadable", n + 2))),
            }
        }
        if !ended {
            return Err(ParseError::format("truncated, no END"));
        }

        found.retain(|(_, category, _)| !settings.is_excluded(category));

        let corners = |[x, y, z]: [f64; 3]| [[x - 0.5, y - 0.5, z], [x + 0.5, y - 0.5, z], [x, y + 0.5, z + 1.0]];
        let coordination = if settings.normalize_coordinates {
            Bounds::from_points(found.iter().flat_map(|(_, _, at)| corners(*at)))
                .map(|b| b.center())
                .map_or([0.0; 3], |[x, y, z]| [-x, -y, -z])
        } else {
            [0.0; 3]
        };

        let elements = found
            .iter()
            .map(|(id, category, at)| {
                let mut mesh = MeshData::new();
                for p in corners(*at) {
                    for axis in 0..3 {
                        mesh.positions.push((p[axis] + coordination[axis]) as f32);
                    }
                    mesh.normals.extend_from_slice(&[0.0, 0.0, 1.0]);
                }
                mesh.indices.extend_from_slice(&[0, 1, 2]);
                ParsedElement {
                    id: *id,
                    category: category.clone(),
                    mesh,
                    color: get_default_color(category),
                }
            })
            .collect();

        let properties = (with_meta && settings.include_properties).then(|| {
            found
                .iter()
                .map(|(id, category, _)| {
                    let mut record = ElementProperties::new(*id, category.clone());
                    record.name = Some(format!("{} {}", category.name(), id.0));
                    let mut pset = PropertySet::new("Pset_Fake");
                    pset.add(Property::with_unit("Height", "1", "m"));
                    record.property_sets.push(pset);
                    (id.0, record)
                })
                .collect::<LocalProperties>()
        });

        Ok(ParsedModel {
            elements,
            properties,
            coordination,
            unit_scale: 1.0,
            ..Default::default()
        })
    }
}

fn fake_model(elements: &[(&str, [f64; 3])], meta: bool) -> Vec<u8> {
    let mut text = String::from("FAKE v1\n");
    if meta {
        text.push_str("META\n");
    }
    for (ty, [x, y, z]) in elements {
        text.push_str(&format!("{ty} {x} {y} {z}\n"));
    }
    text.push_str("END\n");
    text.into_bytes()
}

/// Ten elements, two of them reinforcing bars
fn ten_elements(meta: bool) -> Vec<u8> {
    let mut elements = Vec::new();
    for i in 0..8 {
        let ty = if i % 2 == 0 { "IFCWALL" } else { "IFCSLAB" };
        elements.push((ty, [i as f64 * 2.0, 0.0, 0.0]));
    }
    elements.push(("IFCREINFORCINGBAR", [0.0, 5.0, 0.0]));
    elements.push(("IFCREINFORCINGBAR", [2.0, 5.0, 0.0]));
    fake_model(&elements, meta)
}

fn manager() -> FragmentsManager {
    FragmentsManager::new(Arc::new(FakeParser), FragmentsConfig::default())
}

#[tokio::test]
async fn exclusion_scenario_end_to_end() {
    let mut manager = manager();
    manager.settings_mut().exclude(IfcType::IfcReinforcingBar);

    let group = manager.load_and_register(ten_elements(true), "site").await.unwrap();
    assert_eq!(group.name(), "site");
    assert_eq!(group.element_count().unwrap(), 8);
    group
        .read(|data| {
            assert!(data
                .fragments
                .iter()
                .all(|f| f.category != IfcType::IfcReinforcingBar));
            let properties = data.properties.as_ref().unwrap();
            assert_eq!(properties.len(), 8);
            assert!(properties
                .values()
                .all(|p| p.category != IfcType::IfcReinforcingBar));
        })
        .unwrap();

    let artifact = manager.export(&group).unwrap();
    assert!(artifact.properties.is_some());

    assert_eq!(manager.dispose_all(), 1);
    assert!(manager.is_empty());
    assert!(manager.get(group.id()).is_none());
    assert!(matches!(
        manager.export(&group),
        Err(FragmentError::InvalidState(_))
    ));
}

#[tokio::test]
async fn properties_only_when_the_source_has_them() {
    let mut manager = manager();
    let bare = manager.load_and_register(ten_elements(false), "bare").await.unwrap();
    assert!(!bare.has_properties().unwrap());
    assert!(manager.export(&bare).unwrap().properties.is_none());

    let rich = manager.load_and_register(ten_elements(true), "rich").await.unwrap();
    assert!(manager.export(&rich).unwrap().properties.is_some());

    manager.settings_mut().set_include_properties(false);
    let dropped = manager.load_and_register(ten_elements(true), "dropped").await.unwrap();
    assert!(!dropped.has_properties().unwrap());
    assert!(manager.export(&dropped).unwrap().properties.is_none());
}

#[tokio::test]
async fn failed_loads_leave_the_registry_alone() {
    let mut manager = manager();
    manager.load_and_register(ten_elements(false), "kept").await.unwrap();

    let mut truncated = ten_elements(false);
    truncated.truncate(truncated.len() - 4);
    let err = manager.load_and_register(truncated, "x").await.unwrap_err();
    assert!(matches!(err, FragmentError::Parse(_)));

    let err = manager
        .load_and_register(b"FAKE v9\nEND\n".to_vec(), "x")
        .await
        .unwrap_err();
    assert!(matches!(err, FragmentError::UnsupportedSchema(ref s) if s == "v9"));

    let err = manager
        .load_and_register(b"\x89PNG".to_vec(), "x")
        .await
        .unwrap_err();
    assert!(matches!(err, FragmentError::Parse(_)));

    assert_eq!(manager.groups().len(), 1);
}

#[tokio::test]
async fn export_then_import_round_trips() {
    let mut manager = FragmentsManager::new(
        Arc::new(FakeParser),
        FragmentsConfig::default().with_compression(true),
    );
    let group = manager.load_and_register(ten_elements(true), "site").await.unwrap();
    let artifact = manager.export(&group).unwrap();

    let imported = manager
        .import(&artifact.fragments, artifact.properties.as_deref())
        .unwrap();
    assert_ne!(imported.id(), group.id());
    assert_eq!(imported.name(), "site");
    assert_eq!(manager.groups().len(), 2);
    assert_eq!(
        imported.element_count().unwrap(),
        group.element_count().unwrap()
    );

    let (a, b) = (group.bounds().unwrap().unwrap(), imported.bounds().unwrap().unwrap());
    assert!(a.approx_eq(&b, 1e-6), "{a:?} vs {b:?}");
    assert_eq!(imported.coordination().unwrap(), group.coordination().unwrap());

    let (original, restored) = (
        group.read(|d| d.properties.clone()).unwrap(),
        imported.read(|d| d.properties.clone()).unwrap(),
    );
    assert_eq!(original, restored);

    let geometry_only = manager.import(&artifact.fragments, None).unwrap();
    assert!(!geometry_only.has_properties().unwrap());
}

#[tokio::test]
async fn exports_are_deterministic() {
    let mut manager = manager();
    let group = manager.load_and_register(ten_elements(true), "site").await.unwrap();
    let first = manager.export(&group).unwrap();
    let second = manager.export(&group).unwrap();
    assert_eq!(first.fragments, second.fragments);
    assert_eq!(first.properties, second.properties);

    // Same geometry loaded twice encodes the same way
    let twin = manager.load_and_register(ten_elements(true), "twin").await.unwrap();
    assert_eq!(manager.export(&twin).unwrap().fragments, first.fragments);
}

#[tokio::test]
async fn normalization_centers_far_models() {
    let mut manager = manager();
    let far = fake_model(
        &[
            ("IFCCOLUMN", [9990.0, -10.0, 4999.5]),
            ("IFCCOLUMN", [10010.0, 10.0, 4999.5]),
        ],
        false,
    );

    let group = manager.load_and_register(far.clone(), "far").await.unwrap();
    let center = group.bounds().unwrap().unwrap().center();
    for c in center {
        assert!(c.abs() < 1e-3, "center {center:?}");
    }
    assert_relative_eq!(group.coordination().unwrap()[0], -10000.0, epsilon = 1e-9);

    manager.settings_mut().set_normalize_coordinates(false);
    let kept = manager.load_and_register(far, "kept").await.unwrap();
    let center = kept.bounds().unwrap().unwrap().center();
    assert_relative_eq!(center[0], 10000.0, epsilon = 1e-2);
    assert_relative_eq!(center[2], 5000.0, epsilon = 1e-2);
}

#[tokio::test]
async fn stale_loads_are_discarded() {
    let mut manager = manager();
    let pending = manager.load(ten_elements(false)).await.unwrap();
    let group = pending.group.clone();

    manager.dispose_all();
    let err = manager.register(pending).unwrap_err();
    assert!(matches!(err, FragmentError::StaleLoad { .. }));
    assert!(manager.is_empty());
    assert!(group.is_disposed());

    let pending = manager.load(ten_elements(false)).await.unwrap();
    manager.cancel_pending();
    assert!(matches!(
        manager.register(pending),
        Err(FragmentError::StaleLoad { .. })
    ));

    // Loads started after the bump register normally
    let pending = manager.load(ten_elements(false)).await.unwrap();
    manager.register(pending).unwrap();
    assert_eq!(manager.groups().len(), 1);
}

#[tokio::test]
async fn timed_out_loads_never_register() {
    let mut manager = FragmentsManager::new(
        Arc::new(FakeParser),
        FragmentsConfig::default().with_load_timeout(Some(Duration::from_millis(20))),
    );
    let slow = b"FAKE v1\nSLEEP 300\nIFCWALL 0 0 0\nEND\n".to_vec();
    let err = manager.load_and_register(slow, "slow").await.unwrap_err();
    assert!(matches!(err, FragmentError::Timeout(_)));
    assert!(manager.is_empty());
}

#[tokio::test]
async fn dispose_one_and_dispose_all() {
    let mut manager = manager();
    assert_eq!(manager.dispose_all(), 0);
    assert!(manager.is_empty());

    let a = manager.load_and_register(ten_elements(false), "a").await.unwrap();
    let b = manager.load_and_register(ten_elements(false), "b").await.unwrap();

    manager.dispose(a.id()).unwrap();
    assert!(a.is_disposed());
    assert!(matches!(manager.dispose(a.id()), Err(FragmentError::NotFound(_))));
    assert_eq!(manager.groups(), vec![b.clone()]);

    assert_eq!(manager.dispose_all(), 1);
    assert!(b.is_disposed());
    assert!(matches!(b.element_count(), Err(FragmentError::InvalidState(_))));
}

#[tokio::test]
async fn events_follow_the_lifecycle() {
    let mut manager = manager();
    let mut events = manager.subscribe();

    let group = manager.load_and_register(ten_elements(false), "site").await.unwrap();
    manager.export(&group).unwrap();
    manager.dispose(group.id()).unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    assert!(matches!(seen.first(), Some(FragmentEvent::LoadStarted { .. })));
    assert!(seen.iter().any(|e| matches!(e, FragmentEvent::LoadProgress { .. })));
    assert!(seen.iter().any(|e| matches!(
        e,
        FragmentEvent::LoadFinished { elements: 10, .. }
    )));
    let tail: Vec<&FragmentEvent> = seen.iter().rev().take(3).collect();
    assert_eq!(tail[0], &FragmentEvent::Disposed(group.id()));
    assert!(matches!(tail[1], FragmentEvent::Exported { .. }));
    assert_eq!(tail[2], &FragmentEvent::Registered(group.id()));
}
