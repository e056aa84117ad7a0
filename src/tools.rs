//! Selection and transform tool.
//!
//! The [`Gizmo`] holds at most one selected scene node. While a drag is active,
//! pointer motion translates that node in the plane spanned by the camera's right
//! vector and the world up axis, and navigation input is suspended.

use cgmath::Vector3;

use crate::{
    camera::Camera,
    data_structures::scene_graph::{NodeId, Scene},
};

pub trait TransformTool {
    /// Select `node`, replacing any previous selection.
    fn attach(&mut self, node: NodeId);
    fn is_dragging(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gizmo {
    attached: Option<NodeId>,
    dragging: bool,
    /// World units per pixel of pointer motion.
    drag_speed: f32,
}

impl Default for Gizmo {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl Gizmo {
    pub fn new(drag_speed: f32) -> Self {
        Self {
            attached: None,
            dragging: false,
            drag_speed,
        }
    }

    /// Start dragging. Returns false (and stays idle) without a selection.
    pub fn begin_drag(&mut self) -> bool {
        self.dragging = self.attached.is_some();
        self.dragging
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Move the selected node by a pointer delta in pixels.
    pub fn drag(&self, scene: &mut Scene, camera: &Camera, dx: f64, dy: f64) {
        if !self.dragging {
            return;
        }
        let Some(node) = self.attached.and_then(|id| scene.node_mut(id)) else {
            return;
        };
        let offset: Vector3<f32> = camera.right() * (dx as f32 * self.drag_speed)
            + Vector3::unit_y() * (-dy as f32 * self.drag_speed);
        node.instance.position += offset;
    }
}

impl TransformTool for Gizmo {
    fn attach(&mut self, node: NodeId) {
        log::info!("[Diagnostic] Transform tool attached to node {}", node.index());
        self.attached = Some(node);
        self.dragging = false;
    }

    fn is_dragging(&self) -> bool {
        self.dragging
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cgmath::Vector3;

    use super::*;
    use crate::data_structures::{
        instance::Instance, model::ModelData, scene_graph::NodeRole,
    };

    #[test]
    fn cannot_drag_without_a_selection() {
        let mut gizmo = Gizmo::default();
        assert!(!gizmo.begin_drag());
        assert!(!gizmo.is_dragging());
    }

    #[test]
    fn dragging_moves_the_selected_node() {
        let mut scene = Scene::new();
        let node = scene.add(
            "exhibit",
            NodeRole::Exhibit,
            Arc::new(ModelData::unit_cube("cube")),
            Instance::from(Vector3::new(0.0, 1.0, -6.0)),
        );
        let camera = Camera::looking_forward((0.0, 1.6, 5.0));
        let mut gizmo = Gizmo::new(0.5);
        gizmo.attach(node);

        gizmo.drag(&mut scene, &camera, 2.0, 0.0);
        assert_eq!(scene.node(node).map(|n| n.instance.position.x), Some(0.0));

        assert!(gizmo.begin_drag());
        gizmo.drag(&mut scene, &camera, 2.0, -2.0);
        let position = scene.node(node).map(|n| n.instance.position).unwrap();
        assert!((position.x - 1.0).abs() < 1e-5);
        assert!((position.y - 2.0).abs() < 1e-5);

        gizmo.end_drag();
        assert!(!gizmo.is_dragging());
    }
}
