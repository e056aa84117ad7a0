use std::sync::Arc;

use flow_viewer::{
    ViewerError,
    config::{NavigationConfig, PlacementConfig},
    data_structures::scene_graph::{NodeRole, Scene},
    import::{AssetKind, CompletedImport, ImportPipeline, Manifest, Placement},
    resources::{AssetFormat, GLTF_EXTENSION, ImporterRegistry, OBJ_EXTENSION},
};
use futures::{StreamExt, executor::block_on, stream::FuturesUnordered};

use crate::common::test_utils::{
    GatedImporter, InstantImporter, MockRig, MockTool, approx_eq, box_model, permutations,
};

mod common;

fn registry_with(importer: GatedImporter) -> ImporterRegistry {
    let registry = ImporterRegistry::new();
    registry.install(GLTF_EXTENSION, AssetFormat::Gltf, Arc::new(importer.clone()));
    registry.install(OBJ_EXTENSION, AssetFormat::Obj, Arc::new(importer));
    registry
}

struct Harness {
    scene: Scene,
    rig: MockRig,
    tool: MockTool,
    placement: Placement,
}

impl Harness {
    fn new() -> Self {
        Self {
            scene: Scene::new(),
            rig: MockRig::default(),
            tool: MockTool::default(),
            placement: Placement::new(PlacementConfig::default(), &NavigationConfig::default()),
        }
    }

    fn apply(&mut self, completed: CompletedImport) -> Result<flow_viewer::import::ImportedAsset, ViewerError> {
        self.placement
            .apply(completed, &mut self.scene, &mut self.rig, &mut self.tool)
    }
}

#[test]
fn placement_follows_the_dispatch_index_not_the_completion_order() {
    let placement_config = PlacementConfig::default();
    let navigation = NavigationConfig::default();
    let manifest = Manifest::new(&["a.obj", "b.glb", "c.obj"], Some(1), &placement_config);
    let importer = GatedImporter::default();
    let pipeline = ImportPipeline::new(registry_with(importer.clone()));

    let dispatch = pipeline.dispatch(manifest.descriptors());
    assert!(dispatch.skipped.is_empty());
    assert_eq!(importer.in_flight(), 3);
    let mut in_flight: FuturesUnordered<_> = dispatch.pending.into_iter().collect();
    let mut harness = Harness::new();

    // C, then A, then B
    importer.finish("c.obj", Ok(box_model("c", 1.0, 4.0, 1.0)));
    let c = block_on(in_flight.next()).expect("c finished");
    assert_eq!(c.context.descriptor.index, 2);
    let c = harness.apply(c).expect("c placed");

    importer.finish("a.obj", Ok(box_model("a", 1.0, 1.0, 1.0)));
    let a = block_on(in_flight.next()).expect("a finished");
    assert_eq!(a.context.descriptor.url, "a.obj");
    let a = harness.apply(a).expect("a placed");

    importer.finish("b.glb", Ok(box_model("b", 20.0, 0.5, 20.0)));
    let b = block_on(in_flight.next()).expect("b finished");
    assert_eq!(b.context.format, AssetFormat::Gltf);
    let b = harness.apply(b).expect("b placed");
    assert!(block_on(in_flight.next()).is_none());

    // B is the floor
    assert_eq!(b.descriptor.kind, AssetKind::Floor);
    assert!(b.collidable);
    let floor = harness.scene.node(b.node).expect("floor node");
    assert_eq!(floor.role, NodeRole::Floor);
    assert!(floor.collidable);
    assert!(approx_eq(floor.world_bounds().max.y, 0.0));
    assert!(approx_eq(
        harness.rig.height,
        navigation.ground_height + navigation.spawn_clearance
    ));
    assert!(b.pedestal.is_none());

    // A and C sit in their own slots on pedestals
    for (asset, slot) in [(&a, 0.0), (&c, 2.0)] {
        assert!(!asset.collidable);
        assert!(approx_eq(asset.anchor.x, slot * placement_config.spacing));
        assert!(approx_eq(asset.anchor.y, placement_config.pedestal_height));
        assert!(approx_eq(asset.anchor.z, placement_config.depth));

        let bounds = harness.scene.node(asset.node).expect("exhibit").world_bounds();
        assert!(approx_eq(bounds.center().x, asset.anchor.x));
        assert!(approx_eq(bounds.min.y, placement_config.pedestal_height));

        let pedestal = asset.pedestal.and_then(|id| harness.scene.node(id)).expect("pedestal");
        assert_eq!(pedestal.role, NodeRole::Pedestal);
        assert!(approx_eq(pedestal.world_bounds().max.y, placement_config.pedestal_height));
        assert!(approx_eq(pedestal.world_bounds().min.y, 0.0));
    }

    // exhibits are scaled to the configured height
    let exhibit_height = placement_config.exhibit_height.expect("default scales exhibits");
    let c_bounds = harness.scene.node(c.node).expect("c").world_bounds();
    assert!(approx_eq(c_bounds.size().y, exhibit_height));

    // C arrived first, so C is selected
    assert_eq!(harness.tool.attached, vec![c.node]);
    assert_eq!(harness.placement.first_selectable(), Some(c.node));
    assert_eq!(harness.placement.collidable().collect::<Vec<_>>(), vec![b.node]);
    assert_eq!(harness.placement.report().placed.len(), 3);
}

#[test]
fn placement_is_keyed_by_index_for_every_completion_order() {
    let placement_config = PlacementConfig::default();
    let urls = ["a.obj", "floor.glb", "c.obj", "d.obj"];
    let manifest = Manifest::new(&urls, Some(1), &placement_config);

    for order in permutations(&urls) {
        let importer = GatedImporter::default();
        let pipeline = ImportPipeline::new(registry_with(importer.clone()));
        let mut in_flight: FuturesUnordered<_> =
            pipeline.dispatch(manifest.descriptors()).pending.into_iter().collect();
        let mut harness = Harness::new();
        let mut first_exhibit = None;

        for url in &order {
            importer.finish(url, Ok(box_model(url, 1.0, 1.0, 1.0)));
            let completed = block_on(in_flight.next()).expect("one import finished");
            assert_eq!(completed.context.descriptor.url, *url, "order {order:?}");
            let asset = harness.apply(completed).expect("placed");
            if asset.descriptor.kind == AssetKind::Model && first_exhibit.is_none() {
                first_exhibit = Some(asset.node);
            }
        }
        assert!(block_on(in_flight.next()).is_none());

        let report = harness.placement.report();
        assert_eq!(report.placed.len(), urls.len(), "order {order:?}");
        for asset in &report.placed {
            let index = asset.descriptor.index;
            assert_eq!(asset.descriptor.url, urls[index]);
            match asset.descriptor.kind {
                AssetKind::Floor => {
                    assert_eq!(index, 1);
                    let floor = harness.scene.node(asset.node).expect("floor node");
                    assert!(approx_eq(floor.world_bounds().max.y, 0.0), "order {order:?}");
                }
                AssetKind::Model => {
                    assert!(
                        approx_eq(asset.anchor.x, index as f32 * placement_config.spacing),
                        "{} in order {order:?}",
                        asset.descriptor.url
                    );
                }
            }
        }

        let floor = report
            .placed
            .iter()
            .find(|asset| asset.descriptor.kind == AssetKind::Floor)
            .map(|asset| asset.node);
        let collidable: Vec<_> = harness
            .scene
            .collidable()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(collidable, vec!["floor.glb"], "order {order:?}");
        assert_eq!(
            harness.placement.collidable().collect::<Vec<_>>(),
            floor.into_iter().collect::<Vec<_>>()
        );

        let first_exhibit = first_exhibit.expect("three exhibits");
        assert_eq!(harness.tool.attached, vec![first_exhibit], "order {order:?}");
        let expected_name = order.iter().find(|url| **url != "floor.glb").copied();
        assert_eq!(
            harness.scene.node(first_exhibit).map(|node| node.name.as_str()),
            expected_name
        );
    }
}

#[test]
fn failed_import_leaves_its_slot_empty() {
    let manifest = Manifest::new(&["a.obj", "b.obj", "c.obj"], None, &PlacementConfig::default());
    let importer = GatedImporter::default();
    let pipeline = ImportPipeline::new(registry_with(importer.clone()));
    let mut in_flight: FuturesUnordered<_> =
        pipeline.dispatch(manifest.descriptors()).pending.into_iter().collect();
    let mut harness = Harness::new();

    importer.finish("a.obj", Err(anyhow::anyhow!("404 Not Found")));
    let a = block_on(in_flight.next()).expect("a finished");
    let error = harness.apply(a).expect_err("a failed");
    assert!(matches!(error, ViewerError::LoadFailure { ref target, .. } if target == "a.obj"));
    assert!(harness.scene.is_empty());
    assert!(harness.tool.attached.is_empty());

    importer.finish("b.obj", Ok(box_model("b", 1.0, 1.0, 1.0)));
    importer.finish("c.obj", Ok(box_model("c", 1.0, 1.0, 1.0)));
    while let Some(completed) = block_on(in_flight.next()) {
        harness.apply(completed).expect("placed");
    }

    let report = harness.placement.report();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.placed.len(), 2);
    assert_eq!(harness.tool.attached.len(), 1);
    let slots: Vec<usize> = report.placed.iter().map(|a| a.descriptor.index).collect();
    assert!(slots.contains(&1) && slots.contains(&2));
    // a failed import never becomes the selection
    let selected = harness.tool.attached[0];
    assert_ne!(harness.scene.node(selected).map(|n| n.name.as_str()), Some("a.obj"));
}

#[test]
fn unsupported_and_inactive_formats_are_skipped() {
    let registry = ImporterRegistry::new();
    registry.install(OBJ_EXTENSION, AssetFormat::Obj, Arc::new(InstantImporter(1.0)));
    let pipeline = ImportPipeline::new(registry);
    let manifest = Manifest::new(
        &["scene.fbx", "building.glb", "statue.obj"],
        None,
        &PlacementConfig::default(),
    );

    let dispatch = pipeline.dispatch(manifest.descriptors());

    assert_eq!(dispatch.pending.len(), 1);
    let skipped: Vec<_> = dispatch
        .skipped
        .iter()
        .map(|(descriptor, error)| (descriptor.url.as_str(), error.clone()))
        .collect();
    assert_eq!(
        skipped,
        vec![
            (
                "scene.fbx",
                ViewerError::UnsupportedFormat {
                    url: "scene.fbx".to_string()
                }
            ),
            (
                "building.glb",
                ViewerError::UnsupportedFormat {
                    url: "building.glb".to_string()
                }
            ),
        ]
    );
}

#[test]
fn import_all_hands_over_every_completion() {
    let registry = ImporterRegistry::new();
    registry.install(OBJ_EXTENSION, AssetFormat::Obj, Arc::new(InstantImporter(2.0)));
    registry.install(GLTF_EXTENSION, AssetFormat::Gltf, Arc::new(InstantImporter(0.2)));
    let pipeline = ImportPipeline::new(registry);
    let manifest = Manifest::new(
        &["a.obj", "floor.glb", "b.obj", "notes.txt"],
        Some(1),
        &PlacementConfig::default(),
    );
    let mut harness = Harness::new();

    let skipped = block_on(pipeline.import_all(manifest.descriptors(), |completed| {
        harness.apply(completed).expect("placed");
    }));
    harness.placement.record_skipped(skipped);

    let report = harness.placement.report();
    assert_eq!(report.placed.len(), 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.settled(), manifest.len());
    // two exhibits, one pedestal each, plus the floor
    assert_eq!(harness.scene.len(), 5);
    assert_eq!(harness.scene.with_role(NodeRole::Pedestal).count(), 2);
    assert_eq!(harness.scene.collidable().count(), 1);
}
