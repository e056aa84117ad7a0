use crate::{
    data_structures::{
        instance::Instance,
        model::{MeshData, ModelData, ModelVertex},
    },
    platform::{self, BoxedFuture},
    resources::{AssetImporter, fetch},
};

/// Binary glTF importer backed by the `gltf` crate.
///
/// The node hierarchy is flattened: every primitive is baked into model space
/// using the world transform of the node it hangs off.
#[derive(Debug, Default)]
pub struct GltfImporter;

impl AssetImporter for GltfImporter {
    fn import(&self, url: &str) -> BoxedFuture<'static, anyhow::Result<ModelData>> {
        let url = url.to_string();
        platform::boxed(async move { load_model_gltf(&url).await })
    }
}

pub async fn load_model_gltf(file_name: &str) -> anyhow::Result<ModelData> {
    let gltf_bytes = fetch::load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_bytes)?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.into()),
                None => anyhow::bail!("{file_name} references a binary chunk it doesn't have"),
            },
            gltf::buffer::Source::Uri(uri) => {
                let bin = fetch::load_binary(&fetch::sibling_path(file_name, uri)).await?;
                buffer_data.push(bin);
            }
        }
    }

    let mut meshes = Vec::new();
    let scenes = gltf
        .default_scene()
        .map(|scene| vec![scene])
        .unwrap_or_else(|| gltf.scenes().collect());
    for scene in scenes {
        for node in scene.nodes() {
            collect_meshes(node, &Instance::new(), &buffer_data, &mut meshes);
        }
    }
    if meshes.is_empty() {
        log::warn!("{file_name} contains no meshes.");
    }

    Ok(ModelData {
        name: file_name.to_string(),
        meshes,
    })
}

fn collect_meshes(
    node: gltf::scene::Node,
    parent: &Instance,
    buffers: &[Vec<u8>],
    meshes: &mut Vec<MeshData>,
) {
    let (translation, rotation, scale) = node.transform().decomposed();
    let local = Instance {
        position: translation.into(),
        rotation: rotation.into(),
        scale: scale.into(),
    };
    let world = parent * &local;
    let matrix = world.to_matrix();
    let normal_matrix = cgmath::Matrix4::from(world.rotation);

    if let Some(gltf_mesh) = node.mesh() {
        for primitive in gltf_mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

            let mut vertices: Vec<ModelVertex> = match reader.read_positions() {
                Some(positions) => positions
                    .map(|p| ModelVertex {
                        position: (matrix * cgmath::Vector4::new(p[0], p[1], p[2], 1.0))
                            .truncate()
                            .into(),
                        normal: [0.0; 3],
                    })
                    .collect(),
                None => continue,
            };
            if let Some(normals) = reader.read_normals() {
                for (vertex, n) in vertices.iter_mut().zip(normals) {
                    vertex.normal = (normal_matrix * cgmath::Vector4::new(n[0], n[1], n[2], 0.0))
                        .truncate()
                        .into();
                }
            }
            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };

            let mut mesh = MeshData {
                name: gltf_mesh.name().unwrap_or("unknown_mesh").to_string(),
                vertices,
                indices,
            };
            if !mesh.has_normals() {
                mesh.compute_normals();
            }
            meshes.push(mesh);
        }
    }

    for child in node.children() {
        collect_meshes(child, &world, buffers, meshes);
    }
}
