//! flow-viewer
//!
//! A first-person 3D scene viewer for native windows and the browser (WASM).
//! On start it makes sure the model importer extensions it needs are active,
//! imports a fixed list of glTF and OBJ assets concurrently, places each one as
//! soon as it arrives and lets the user walk through the result.
//!
//! High-level modules
//! - `resolver`: loads missing importer extensions, then continues exactly once
//! - `resources`: importer registry, file fetching and the glTF/OBJ importers
//! - `import`: asset manifest, concurrent import dispatch and placement
//! - `navigation`: first-person controller with gravity, ground clamp and jump
//! - `camera`: camera rig, projection and camera uniform
//! - `tools`: selection/transform tool for the first imported exhibit
//! - `context`: GPU and window context that owns device, queue and uniforms
//! - `data_structures`: meshes, instances, the scene graph and the depth texture
//! - `pipelines` / `render`: the mesh pipeline and scene drawing
//! - `flow`: the winit event loop tying it all together
//! - `config`, `error`, `platform`: settings, error kinds and native/WASM glue
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod import;
pub mod navigation;
pub mod pipelines;
pub mod platform;
pub mod render;
pub mod resolver;
pub mod resources;
pub mod tools;

pub use config::ViewerConfig;
pub use error::{ResolveError, ViewerError};
pub use flow::run;
