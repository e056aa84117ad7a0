//! Concurrent asset import and placement.
//!
//! Importing happens in two halves:
//!
//! 1. [`ImportPipeline::dispatch`] picks an importer per asset and starts one
//!    request per supported asset. Every request carries the [`ImportContext`]
//!    it was dispatched with, so whatever order the requests finish in, each
//!    completion knows which asset it belongs to.
//! 2. [`Placement::apply`] runs on the event-loop thread for every completion,
//!    in completion order, and puts the model into the scene: the floor flush
//!    with y = 0, everything else in a row on pedestals. The first non-floor
//!    asset to arrive becomes the selection of the transform tool.

use std::sync::Arc;

use cgmath::Vector3;
use futures::{StreamExt, stream::FuturesUnordered};

use crate::{
    camera::CameraRig,
    config::{NavigationConfig, PlacementConfig, ViewerConfig},
    data_structures::{
        instance::Instance,
        model::ModelData,
        scene_graph::{NodeId, NodeRole, Scene},
    },
    error::ViewerError,
    platform::{self, BoxedFuture},
    resources::{AssetFormat, ImporterRegistry},
    tools::TransformTool,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    /// The walkable ground. Collidable and placed flush with y = 0.
    Floor,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ScalePolicy {
    /// Keep the file's units.
    Unit,
    Uniform(f32),
    /// Scale uniformly so the model is this tall.
    FitHeight(f32),
}

impl ScalePolicy {
    pub fn factor(&self, model_height: f32) -> f32 {
        match *self {
            Self::Unit => 1.0,
            Self::Uniform(factor) => factor,
            Self::FitHeight(height) if model_height > f32::EPSILON => height / model_height,
            Self::FitHeight(_) => 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PositionPolicy {
    /// Exhibits: slot `index` of the row. Floor: centred on the origin.
    Row,
    /// Put the model's bottom centre (top centre for a floor) at this point.
    Fixed(Vector3<f32>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetDescriptor {
    pub url: String,
    /// Position in the manifest. Decides row slot and floor role.
    pub index: usize,
    pub kind: AssetKind,
    pub scale: ScalePolicy,
    pub position: PositionPolicy,
}

/// The ordered list of assets to import.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Manifest {
    descriptors: Vec<AssetDescriptor>,
}

impl Manifest {
    pub fn new(urls: &[&str], floor_index: Option<usize>, placement: &PlacementConfig) -> Self {
        let descriptors = urls
            .iter()
            .enumerate()
            .map(|(index, url)| {
                let is_floor = floor_index == Some(index);
                AssetDescriptor {
                    url: url.to_string(),
                    index,
                    kind: if is_floor {
                        AssetKind::Floor
                    } else {
                        AssetKind::Model
                    },
                    scale: match (is_floor, placement.exhibit_height) {
                        (true, _) => ScalePolicy::Uniform(placement.floor_scale),
                        (false, Some(height)) => ScalePolicy::FitHeight(height),
                        (false, None) => ScalePolicy::Unit,
                    },
                    position: PositionPolicy::Row,
                }
            })
            .collect();
        Self { descriptors }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(&config.assets, config.floor_index, &config.placement)
    }

    pub fn descriptors(&self) -> &[AssetDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Everything a completion needs to know about its request, fixed at dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportContext {
    pub descriptor: AssetDescriptor,
    pub format: AssetFormat,
}

/// The outcome of one import request.
#[derive(Debug)]
pub struct CompletedImport {
    pub context: ImportContext,
    pub result: anyhow::Result<ModelData>,
}

/// Requests started by [`ImportPipeline::dispatch`].
pub struct Dispatch {
    pub pending: Vec<BoxedFuture<'static, CompletedImport>>,
    /// Assets no request was started for.
    pub skipped: Vec<(AssetDescriptor, ViewerError)>,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("pending", &self.pending.len())
            .field("skipped", &self.skipped)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ImportPipeline {
    registry: ImporterRegistry,
}

impl ImportPipeline {
    pub fn new(registry: ImporterRegistry) -> Self {
        Self { registry }
    }

    /// Start one import per asset that has an active importer.
    ///
    /// Unsupported extensions and formats whose importer extension is absent are
    /// logged and reported in [`Dispatch::skipped`].
    pub fn dispatch(&self, descriptors: &[AssetDescriptor]) -> Dispatch {
        let mut pending = Vec::new();
        let mut skipped = Vec::new();
        for descriptor in descriptors {
            let Some(format) = AssetFormat::from_url(&descriptor.url) else {
                let error = ViewerError::UnsupportedFormat {
                    url: descriptor.url.clone(),
                };
                log::warn!("[Diagnostic] {error}");
                skipped.push((descriptor.clone(), error));
                continue;
            };
            let Some(importer) = self.registry.importer(format) else {
                log::warn!(
                    "[Diagnostic] {} is not active, skipping {}",
                    format.extension_id(),
                    descriptor.url
                );
                skipped.push((
                    descriptor.clone(),
                    ViewerError::UnsupportedFormat {
                        url: descriptor.url.clone(),
                    },
                ));
                continue;
            };

            log::info!("[Diagnostic] Loading model: {}", descriptor.url);
            let request = importer.import(&descriptor.url);
            let context = ImportContext {
                descriptor: descriptor.clone(),
                format,
            };
            pending.push(platform::boxed(async move {
                let result = request.await;
                CompletedImport { context, result }
            }));
        }
        Dispatch { pending, skipped }
    }

    /// Dispatch every asset and hand each completion to `on_complete` as soon as
    /// it arrives. Resolves with the skipped assets once all requests are done.
    ///
    /// The viewer runs this on a spawned task and forwards completions to the
    /// event loop, where they are placed.
    pub async fn import_all<F>(
        &self,
        descriptors: &[AssetDescriptor],
        mut on_complete: F,
    ) -> Vec<(AssetDescriptor, ViewerError)>
    where
        F: FnMut(CompletedImport),
    {
        let Dispatch { pending, skipped } = self.dispatch(descriptors);
        let mut in_flight: FuturesUnordered<_> = pending.into_iter().collect();
        while let Some(completed) = in_flight.next().await {
            on_complete(completed);
        }
        skipped
    }
}

/// An asset that made it into the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedAsset {
    pub descriptor: AssetDescriptor,
    pub node: NodeId,
    pub collidable: bool,
    /// Bottom centre of an exhibit, top centre of a floor.
    pub anchor: Vector3<f32>,
    pub pedestal: Option<NodeId>,
}

/// Summary of a finished import run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportReport {
    pub placed: Vec<ImportedAsset>,
    pub failed: Vec<(AssetDescriptor, ViewerError)>,
    pub skipped: Vec<(AssetDescriptor, ViewerError)>,
}

impl ImportReport {
    pub fn settled(&self) -> usize {
        self.placed.len() + self.failed.len() + self.skipped.len()
    }
}

/// Places completed imports into the scene.
#[derive(Debug)]
pub struct Placement {
    config: PlacementConfig,
    ground_height: f32,
    spawn_clearance: f32,
    pedestal_model: Arc<ModelData>,
    first_selectable: Option<NodeId>,
    report: ImportReport,
}

impl Placement {
    pub fn new(config: PlacementConfig, navigation: &NavigationConfig) -> Self {
        Self {
            config,
            ground_height: navigation.ground_height,
            spawn_clearance: navigation.spawn_clearance,
            pedestal_model: Arc::new(ModelData::unit_cube("pedestal")),
            first_selectable: None,
            report: ImportReport::default(),
        }
    }

    /// The node attached to the transform tool, once an exhibit has arrived.
    pub fn first_selectable(&self) -> Option<NodeId> {
        self.first_selectable
    }

    pub fn collidable(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.report
            .placed
            .iter()
            .filter(|asset| asset.collidable)
            .map(|asset| asset.node)
    }

    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    pub fn record_skipped(&mut self, skipped: Vec<(AssetDescriptor, ViewerError)>) {
        self.report.skipped.extend(skipped);
    }

    /// Put one completed import into the scene.
    ///
    /// A failed import is logged and recorded; the scene, the rig and the tool are
    /// left untouched.
    pub fn apply(
        &mut self,
        completed: CompletedImport,
        scene: &mut Scene,
        rig: &mut dyn CameraRig,
        tool: &mut dyn TransformTool,
    ) -> Result<ImportedAsset, ViewerError> {
        let CompletedImport { context, result } = completed;
        let descriptor = context.descriptor;
        let model = match result {
            Ok(model) => model,
            Err(e) => {
                let error = ViewerError::load_failure(&descriptor.url, &e);
                log::error!("[Diagnostic] Error loading {:?} model: {error}", context.format);
                self.report.failed.push((descriptor, error.clone()));
                return Err(error);
            }
        };
        log::info!(
            "[Diagnostic] Loaded {:?} model: {} ({} vertices)",
            context.format,
            descriptor.url,
            model.vertex_count()
        );

        let asset = match descriptor.kind {
            AssetKind::Floor => self.place_floor(descriptor, model, scene, rig),
            AssetKind::Model => {
                let asset = self.place_exhibit(descriptor, model, scene);
                if self.first_selectable.is_none() {
                    self.first_selectable = Some(asset.node);
                    tool.attach(asset.node);
                }
                asset
            }
        };
        self.report.placed.push(asset.clone());
        Ok(asset)
    }

    fn place_floor(
        &self,
        descriptor: AssetDescriptor,
        model: ModelData,
        scene: &mut Scene,
        rig: &mut dyn CameraRig,
    ) -> ImportedAsset {
        let bounds = model.bounds();
        let scale = descriptor.scale.factor(bounds.size().y);
        let anchor = match descriptor.position {
            PositionPolicy::Row => Vector3::new(0.0, 0.0, 0.0),
            PositionPolicy::Fixed(anchor) => anchor,
        };
        let center = bounds.center();
        let position = anchor
            - Vector3::new(center.x * scale, bounds.max.y * scale, center.z * scale);
        let instance = Instance {
            scale: Vector3::new(scale, scale, scale),
            ..Instance::from(position)
        };

        let node = scene.add(descriptor.url.clone(), NodeRole::Floor, Arc::new(model), instance);
        if let Some(floor) = scene.node_mut(node) {
            floor.collidable = true;
        }
        let spawn_height = anchor.y + self.ground_height + self.spawn_clearance;
        rig.set_height(spawn_height);
        log::info!("[Diagnostic] Floor placed, spawning at height {spawn_height}");

        ImportedAsset {
            descriptor,
            node,
            collidable: true,
            anchor,
            pedestal: None,
        }
    }

    fn place_exhibit(
        &self,
        descriptor: AssetDescriptor,
        model: ModelData,
        scene: &mut Scene,
    ) -> ImportedAsset {
        let bounds = model.bounds();
        let size = bounds.size();
        let scale = descriptor.scale.factor(size.y);
        let anchor = match descriptor.position {
            PositionPolicy::Row => Vector3::new(
                descriptor.index as f32 * self.config.spacing,
                self.config.pedestal_height,
                self.config.depth,
            ),
            PositionPolicy::Fixed(anchor) => anchor,
        };
        let center = bounds.center();
        let position = anchor
            - Vector3::new(center.x * scale, bounds.min.y * scale, center.z * scale);
        let instance = Instance {
            scale: Vector3::new(scale, scale, scale),
            ..Instance::from(position)
        };
        let node = scene.add(descriptor.url.clone(), NodeRole::Exhibit, Arc::new(model), instance);

        let pedestal = (anchor.y > 0.0).then(|| {
            let margin = self.config.pedestal_margin;
            let footprint = Vector3::new(
                (size.x * scale * margin).max(0.1),
                anchor.y,
                (size.z * scale * margin).max(0.1),
            );
            let instance = Instance {
                scale: footprint,
                ..Instance::from(Vector3::new(anchor.x, anchor.y / 2.0, anchor.z))
            };
            scene.add(
                format!("{} pedestal", descriptor.url),
                NodeRole::Pedestal,
                self.pedestal_model.clone(),
                instance,
            )
        });

        ImportedAsset {
            descriptor,
            node,
            collidable: false,
            anchor,
            pedestal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_marks_the_floor_by_index() {
        let placement = PlacementConfig::default();
        let manifest = Manifest::new(&["a.obj", "b.glb", "c.obj"], Some(1), &placement);
        let kinds: Vec<_> = manifest.descriptors().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![AssetKind::Model, AssetKind::Floor, AssetKind::Model]);
        assert_eq!(manifest.descriptors()[2].index, 2);
        assert_eq!(
            manifest.descriptors()[1].scale,
            ScalePolicy::Uniform(placement.floor_scale)
        );
    }

    #[test]
    fn fit_height_ignores_flat_models() {
        assert_eq!(ScalePolicy::FitHeight(2.0).factor(4.0), 0.5);
        assert_eq!(ScalePolicy::FitHeight(2.0).factor(0.0), 1.0);
        assert_eq!(ScalePolicy::Unit.factor(3.0), 1.0);
    }
}
