use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use flow_viewer::{
    camera::CameraRig,
    data_structures::{model::ModelData, scene_graph::NodeId},
    platform::{self, BoxedFuture},
    resolver::ExtensionHost,
    resources::AssetImporter,
    tools::TransformTool,
};
use futures::channel::oneshot;

#[derive(Default)]
struct HostState {
    present: HashSet<String>,
    loads: Vec<String>,
    in_flight: HashMap<String, oneshot::Sender<anyhow::Result<()>>>,
}

/// Extension host whose loads only finish when the test says so.
#[derive(Clone, Default)]
pub struct MockHost {
    state: Arc<Mutex<HostState>>,
}

impl MockHost {
    pub fn with_present(ids: &[&str]) -> Self {
        let host = Self::default();
        host.state
            .lock()
            .unwrap()
            .present
            .extend(ids.iter().map(|id| id.to_string()));
        host
    }

    /// Every id a load was issued for, in issue order.
    pub fn loads(&self) -> Vec<String> {
        self.state.lock().unwrap().loads.clone()
    }

    pub fn complete(&self, id: &str) {
        self.settle(id, Ok(()));
    }

    pub fn fail(&self, id: &str) {
        self.settle(id, Err(anyhow::anyhow!("script error loading {id}")));
    }

    fn settle(&self, id: &str, result: anyhow::Result<()>) {
        let sender = self
            .state
            .lock()
            .unwrap()
            .in_flight
            .remove(id)
            .unwrap_or_else(|| panic!("no load in flight for {id}"));
        sender.send(result).expect("load future was dropped");
    }
}

impl ExtensionHost for MockHost {
    fn has(&self, id: &str) -> bool {
        self.state.lock().unwrap().present.contains(id)
    }

    fn load(&self, id: &str) -> BoxedFuture<'static, anyhow::Result<()>> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().unwrap();
            state.loads.push(id.to_string());
            state.in_flight.insert(id.to_string(), tx);
        }
        let state = self.state.clone();
        let id = id.to_string();
        platform::boxed(async move {
            let result = rx
                .await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("load of {id} was abandoned")));
            if result.is_ok() {
                state.lock().unwrap().present.insert(id);
            }
            result
        })
    }
}

/// Importer whose requests finish when the test calls [`GatedImporter::finish`].
#[derive(Clone, Default)]
pub struct GatedImporter {
    gates: Arc<Mutex<HashMap<String, oneshot::Sender<anyhow::Result<ModelData>>>>>,
}

impl GatedImporter {
    pub fn finish(&self, url: &str, result: anyhow::Result<ModelData>) {
        let sender = self
            .gates
            .lock()
            .unwrap()
            .remove(url)
            .unwrap_or_else(|| panic!("no import in flight for {url}"));
        sender.send(result).expect("import future was dropped");
    }

    pub fn in_flight(&self) -> usize {
        self.gates.lock().unwrap().len()
    }
}

impl AssetImporter for GatedImporter {
    fn import(&self, url: &str) -> BoxedFuture<'static, anyhow::Result<ModelData>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(url.to_string(), tx);
        let url = url.to_string();
        platform::boxed(async move {
            rx.await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("import of {url} was abandoned")))
        })
    }
}

/// Importer that answers every request right away with a box of the given height.
#[derive(Clone, Copy)]
pub struct InstantImporter(pub f32);

impl AssetImporter for InstantImporter {
    fn import(&self, url: &str) -> BoxedFuture<'static, anyhow::Result<ModelData>> {
        let model = box_model(url, 1.0, self.0, 1.0);
        platform::boxed(async move { Ok(model) })
    }
}

/// An axis aligned box `width` x `height` x `depth` centred on the origin.
pub fn box_model(name: &str, width: f32, height: f32, depth: f32) -> ModelData {
    let mut model = ModelData::unit_cube(name);
    for mesh in model.meshes.iter_mut() {
        for vertex in mesh.vertices.iter_mut() {
            vertex.position[0] *= width;
            vertex.position[1] *= height;
            vertex.position[2] *= depth;
        }
    }
    model
}

/// Records everything the controller does to the camera.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MockRig {
    pub forward: f32,
    pub right: f32,
    pub height: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl MockRig {
    pub fn at_height(height: f32) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }
}

impl CameraRig for MockRig {
    fn move_forward(&mut self, distance: f32) {
        self.forward += distance;
    }

    fn move_right(&mut self, distance: f32) {
        self.right += distance;
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn set_height(&mut self, height: f32) {
        self.height = height;
    }

    fn rotate(&mut self, yaw: f32, pitch: f32) {
        self.yaw += yaw;
        self.pitch += pitch;
    }
}

#[derive(Debug, Default)]
pub struct MockTool {
    pub attached: Vec<NodeId>,
    pub dragging: bool,
}

impl TransformTool for MockTool {
    fn attach(&mut self, node: NodeId) {
        self.attached.push(node);
    }

    fn is_dragging(&self) -> bool {
        self.dragging
    }
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

/// Every ordering of `items`.
pub fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut all = Vec::new();
    for (i, first) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first.clone());
            all.push(tail);
        }
    }
    all
}
