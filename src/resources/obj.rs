use std::io::{BufReader, Cursor};

use crate::{
    data_structures::model::{MeshData, ModelData, ModelVertex},
    platform::{self, BoxedFuture},
    resources::{AssetImporter, fetch},
};

/// Wavefront OBJ importer backed by `tobj`.
///
/// `mtllib` references are never fetched; the viewer renders every mesh with a
/// flat colour.
#[derive(Debug, Default)]
pub struct ObjImporter;

impl AssetImporter for ObjImporter {
    fn import(&self, url: &str) -> BoxedFuture<'static, anyhow::Result<ModelData>> {
        let url = url.to_string();
        platform::boxed(async move { load_model_obj(&url).await })
    }
}

pub async fn load_model_obj(file_name: &str) -> anyhow::Result<ModelData> {
    let obj_text = fetch::load_string(file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, _) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        skip_material,
    )
    .await?;

    let meshes = models.iter().map(to_mesh).collect::<Vec<_>>();
    if meshes.is_empty() {
        log::warn!("{file_name} contains no meshes.");
    }
    Ok(ModelData {
        name: file_name.to_string(),
        meshes,
    })
}

async fn skip_material(mtl: String) -> tobj::MTLLoadResult {
    log::debug!("Not loading material library {mtl}");
    Err(tobj::LoadError::OpenFileFailed)
}

/**
 * Obj files often come without normals; in that case flat normals are calculated so
 * that the shading still shows the shape.
 */
fn to_mesh(m: &tobj::Model) -> MeshData {
    let vertices = (0..m.mesh.positions.len() / 3)
        .map(|i| ModelVertex {
            position: [
                m.mesh.positions[i * 3],
                m.mesh.positions[i * 3 + 1],
                m.mesh.positions[i * 3 + 2],
            ],
            normal: [
                m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
        })
        .collect::<Vec<_>>();

    let mut mesh = MeshData {
        name: m.name.clone(),
        vertices,
        // The indices are for positions and normals because `single_index` is set
        indices: m.mesh.indices.clone(),
    };
    if !mesh.has_normals() {
        mesh.compute_normals();
    }
    mesh
}
