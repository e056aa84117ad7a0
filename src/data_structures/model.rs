//! CPU-side mesh data produced by the importers.
//!
//! Importers decode a file into a [`ModelData`] (a flat list of meshes in model
//! space). The renderer uploads it to the GPU once the node is in the scene; the
//! placement logic only needs its [`Aabb`].

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f32; 3]>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            let p = Point3::from(*p);
            Some(match acc {
                None => Aabb::new(p, p),
                Some(aabb) => aabb.grow(p),
            })
        })
    }

    pub fn grow(self, p: Point3<f32>) -> Self {
        Self {
            min: Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Normals from the triangles, used when the source file doesn't ship any.
    ///
    /// A vertex shared by several triangles gets the area weighted average.
    pub fn compute_normals(&mut self) {
        let mut accumulated = vec![Vector3::new(0.0f32, 0.0, 0.0); self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= self.vertices.len() || b >= self.vertices.len() || c >= self.vertices.len() {
                continue;
            }
            let p0: Vector3<f32> = self.vertices[a].position.into();
            let p1: Vector3<f32> = self.vertices[b].position.into();
            let p2: Vector3<f32> = self.vertices[c].position.into();
            let face = (p1 - p0).cross(p2 - p0);
            accumulated[a] += face;
            accumulated[b] += face;
            accumulated[c] += face;
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(accumulated) {
            if normal.magnitude2() > f32::EPSILON {
                vertex.normal = normal.normalize().into();
            }
        }
    }

    pub fn has_normals(&self) -> bool {
        self.vertices.iter().any(|v| v.normal != [0.0; 3])
    }
}

/// A decoded asset: every mesh of the file, already in model space.
#[derive(Clone, Debug, Default)]
pub struct ModelData {
    pub name: String,
    pub meshes: Vec<MeshData>,
}

impl ModelData {
    /// Bounds over all meshes. Empty models get a degenerate box at the origin.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(
            self.meshes
                .iter()
                .flat_map(|mesh| mesh.vertices.iter().map(|v| &v.position)),
        )
        .unwrap_or_else(|| Aabb::new(Point3::origin(), Point3::origin()))
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    /// Unit cube centred on the origin with per-face normals.
    ///
    /// Used for the fallback cube and for pedestals, which get their size from the
    /// node's scale.
    pub fn unit_cube(name: &str) -> Self {
        // (normal, tangent u, tangent v) per face
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let n = Vector3::from(normal) * 0.5;
            let u = Vector3::from(u) * 0.5;
            let v = Vector3::from(v) * 0.5;
            let base = vertices.len() as u32;
            for corner in [n - u - v, n + u - v, n + u + v, n - u + v] {
                vertices.push(ModelVertex {
                    position: corner.into(),
                    normal,
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self {
            name: name.to_string(),
            meshes: vec![MeshData {
                name: name.to_string(),
                vertices,
                indices,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_cube_spans_half_a_unit_each_way() {
        let cube = ModelData::unit_cube("cube");
        let bounds = cube.bounds();
        assert_eq!(bounds.min, Point3::new(-0.5, -0.5, -0.5));
        assert_eq!(bounds.max, Point3::new(0.5, 0.5, 0.5));
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.meshes[0].indices.len(), 36);
    }

    #[test]
    fn computed_normals_point_away_from_ccw_faces() {
        let mut mesh = MeshData {
            name: "tri".into(),
            vertices: vec![
                ModelVertex { position: [0.0, 0.0, 0.0], ..Default::default() },
                ModelVertex { position: [1.0, 0.0, 0.0], ..Default::default() },
                ModelVertex { position: [0.0, 1.0, 0.0], ..Default::default() },
            ],
            indices: vec![0, 1, 2],
        };
        assert!(!mesh.has_normals());
        mesh.compute_normals();
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn empty_model_has_degenerate_bounds() {
        let bounds = ModelData::default().bounds();
        assert_eq!(bounds.size(), Vector3::new(0.0, 0.0, 0.0));
    }
}
