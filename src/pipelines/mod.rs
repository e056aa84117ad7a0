//! Render pipelines.
//!
//! - `basic` is the single mesh pipeline every scene node is drawn with
//! - `light` holds the ambient/directional light uniform it reads

pub mod basic;
pub mod light;
