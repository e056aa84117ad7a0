//! Viewer data structures: models, instances, the scene graph and textures.
//!
//! - `model` contains CPU mesh data produced by the importers and bounding boxes
//! - `instance` holds per-node transformation data and its GPU layout
//! - `scene_graph` is the flat node list the import pipeline writes into
//! - `texture` wraps the depth buffer

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
