//! Compiled-in settings of the viewer.
//!
//! There is no config file: the asset manifest, the importer extensions and all
//! tunables live here with their defaults.

use std::time::Duration;

use cgmath::Point3;

use crate::resources::{GLTF_EXTENSION, OBJ_EXTENSION};

pub const DEFAULT_ASSETS: [&str; 5] = [
    "assets/building-test.obj",
    "assets/building.glb",
    "assets/cube.glb",
    "assets/Osiris.obj",
    "assets/RM2352_merged.obj",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub clear_colour: wgpu::Color,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub camera_start: Point3<f32>,
    pub ambient_strength: f32,
    /// Radians per second the fallback cube turns about its y axis.
    pub fallback_spin: f32,
    /// Importer extensions activated before the scene is built.
    pub extensions: Vec<&'static str>,
    pub assets: Vec<&'static str>,
    /// Index in `assets` that is used as the walkable floor.
    pub floor_index: Option<usize>,
    /// Give up on extension loads after this long. `None` waits forever.
    pub resolve_timeout: Option<Duration>,
    pub placement: PlacementConfig,
    pub navigation: NavigationConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            // 0x222222
            clear_colour: wgpu::Color {
                r: 0x22 as f64 / 255.0,
                g: 0x22 as f64 / 255.0,
                b: 0x22 as f64 / 255.0,
                a: 1.0,
            },
            fovy: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            camera_start: Point3::new(0.0, 0.0, 5.0),
            ambient_strength: 0.8,
            fallback_spin: 0.6,
            extensions: vec![GLTF_EXTENSION, OBJ_EXTENSION],
            assets: DEFAULT_ASSETS.to_vec(),
            floor_index: Some(1),
            resolve_timeout: Some(Duration::from_secs(30)),
            placement: PlacementConfig::default(),
            navigation: NavigationConfig::default(),
        }
    }
}

/// Where imported assets end up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementConfig {
    /// Distance along x between neighbouring exhibits (`index * spacing`).
    pub spacing: f32,
    /// Height of the pedestal top, which is where exhibits stand.
    pub pedestal_height: f32,
    /// Pedestal footprint relative to the exhibit's footprint.
    pub pedestal_margin: f32,
    /// z coordinate of the exhibit row.
    pub depth: f32,
    /// Exhibits are scaled so their height matches this. `None` keeps the file's units.
    pub exhibit_height: Option<f32>,
    /// Uniform scale applied to the floor asset.
    pub floor_scale: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            spacing: 4.0,
            pedestal_height: 1.0,
            pedestal_margin: 1.2,
            depth: -6.0,
            exhibit_height: Some(2.0),
            floor_scale: 1.0,
        }
    }
}

/// Tunables of the first-person controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationConfig {
    /// Horizontal velocity lost per second, as a fraction of the velocity.
    pub damping: f32,
    pub gravity: f32,
    pub acceleration: f32,
    /// Acceleration factor while the run key is held.
    pub run_multiplier: f32,
    pub jump_impulse: f32,
    /// Eye height when standing on the ground.
    pub ground_height: f32,
    /// Extra height the rig spawns with above a newly placed floor.
    pub spawn_clearance: f32,
    /// Radians per pixel of pointer motion.
    pub mouse_sensitivity: f32,
    /// Longest step `update` integrates in one go. Must stay below `1 / damping`.
    pub max_step: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            damping: 10.0,
            gravity: 9.8,
            acceleration: 50.0,
            run_multiplier: 2.0,
            jump_impulse: 5.0,
            ground_height: 1.6,
            spawn_clearance: 0.5,
            mouse_sensitivity: 0.002,
            max_step: 0.05,
        }
    }
}
