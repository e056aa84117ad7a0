//! Scene graph of the viewer.
//!
//! The scene is a flat list of nodes: the viewer never nests imported assets, it
//! only places them side by side and puts a pedestal under each. Nodes are never
//! removed, so a [`NodeId`] stays valid for the lifetime of the scene.

use std::sync::Arc;

use cgmath::{Point3, Transform};

use crate::data_structures::{
    instance::Instance,
    model::{Aabb, ModelData},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What a node is in the scene. Only used for colouring and diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeRole {
    /// The spinning cube shown before any asset arrives.
    Fallback,
    Floor,
    /// An imported, non-floor asset.
    Exhibit,
    Pedestal,
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub role: NodeRole,
    pub model: Arc<ModelData>,
    pub instance: Instance,
    pub colour: [f32; 3],
    pub collidable: bool,
}

impl SceneNode {
    /// Bounds of the model after scale and translation.
    ///
    /// Rotation is taken into account by transforming all eight corners.
    pub fn world_bounds(&self) -> Aabb {
        let local = self.model.bounds();
        let matrix = self.instance.to_matrix();
        let corners = [
            Point3::new(local.min.x, local.min.y, local.min.z),
            Point3::new(local.max.x, local.min.y, local.min.z),
            Point3::new(local.min.x, local.max.y, local.min.z),
            Point3::new(local.min.x, local.min.y, local.max.z),
            Point3::new(local.max.x, local.max.y, local.min.z),
            Point3::new(local.max.x, local.min.y, local.max.z),
            Point3::new(local.min.x, local.max.y, local.max.z),
            Point3::new(local.max.x, local.max.y, local.max.z),
        ];
        let first = matrix.transform_point(corners[0]);
        corners[1..]
            .iter()
            .fold(Aabb::new(first, first), |aabb, corner| {
                aabb.grow(matrix.transform_point(*corner))
            })
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        role: NodeRole,
        model: Arc<ModelData>,
        instance: Instance,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let colour = match role {
            NodeRole::Fallback => [0.0, 1.0, 0.0],
            NodeRole::Floor => [0.35, 0.35, 0.38],
            NodeRole::Exhibit => [0.82, 0.78, 0.7],
            NodeRole::Pedestal => [0.55, 0.55, 0.6],
        };
        self.nodes.push(SceneNode {
            id,
            name: name.into(),
            role,
            model,
            instance,
            colour,
            collidable: false,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn with_role(&self, role: NodeRole) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().filter(move |node| node.role == role)
    }

    pub fn collidable(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().filter(|node| node.collidable)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    #[test]
    fn ids_follow_insertion_order() {
        let mut scene = Scene::new();
        let cube = Arc::new(ModelData::unit_cube("cube"));
        let a = scene.add("a", NodeRole::Exhibit, cube.clone(), Instance::new());
        let b = scene.add("b", NodeRole::Pedestal, cube, Instance::new());
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(scene.node(b).map(|n| n.name.as_str()), Some("b"));
        assert_eq!(scene.with_role(NodeRole::Pedestal).count(), 1);
    }

    #[test]
    fn world_bounds_follow_scale_and_translation() {
        let mut scene = Scene::new();
        let instance = Instance {
            scale: Vector3::new(2.0, 4.0, 2.0),
            ..Instance::from(Vector3::new(10.0, 0.0, 0.0))
        };
        let id = scene.add(
            "box",
            NodeRole::Exhibit,
            Arc::new(ModelData::unit_cube("cube")),
            instance,
        );
        let bounds = scene.node(id).map(SceneNode::world_bounds);
        assert_eq!(
            bounds,
            Some(Aabb::new(Point3::new(9.0, -2.0, -1.0), Point3::new(11.0, 2.0, 1.0)))
        );
    }
}
