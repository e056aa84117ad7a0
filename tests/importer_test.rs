use flow_viewer::resources::{AssetImporter, glb::GltfImporter, obj::ObjImporter};

use crate::common::test_utils::approx_eq;

mod common;

#[tokio::test]
async fn obj_without_normals_gets_them_computed() {
    let model = ObjImporter
        .import("tests/fixtures/pyramid.obj")
        .await
        .expect("pyramid.obj parses");

    assert_eq!(model.meshes.len(), 1);
    let mesh = &model.meshes[0];
    assert_eq!(mesh.name, "pyramid");
    // one quad and four triangles
    assert_eq!(mesh.indices.len(), 6 * 3);
    assert!(mesh.vertices.iter().all(|v| v.normal != [0.0; 3]));

    let bounds = model.bounds();
    assert!(approx_eq(bounds.size().y, 1.0));
    assert!(approx_eq(bounds.min.y, 0.0));
}

#[tokio::test]
async fn gltf_nodes_are_baked_into_model_space() {
    let model = GltfImporter
        .import("tests/fixtures/shifted_cube.glb")
        .await
        .expect("shifted_cube.glb parses");

    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.meshes[0].indices.len(), 36);
    assert!(model.meshes[0].has_normals());

    let bounds = model.bounds();
    assert!(approx_eq(bounds.center().x, 3.0));
    assert!(approx_eq(bounds.size().x, 1.0));
}

#[tokio::test]
async fn obj_material_libraries_are_not_required() {
    let model = ObjImporter
        .import("tests/fixtures/with_mtllib.obj")
        .await
        .expect("a dangling mtllib does not fail the import");

    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.meshes[0].indices, vec![0, 1, 2]);
}

#[tokio::test]
async fn missing_files_fail_the_import() {
    assert!(ObjImporter.import("tests/fixtures/missing.obj").await.is_err());
    assert!(GltfImporter.import("tests/fixtures/missing.glb").await.is_err());
}
