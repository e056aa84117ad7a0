//! GPU upload and drawing of the scene.
//!
//! The [`Renderer`] mirrors the CPU [`Scene`]: every model is uploaded once (nodes
//! sharing an `Arc<ModelData>`, like the pedestals, share the GPU buffers) and
//! every node owns a one-element instance buffer that is rewritten each frame.
//!
//! # Key types
//!
//! - [`GpuModel`] and [`GpuMesh`] hold the vertex and index buffers of an upload
//! - [`DrawModel`] draws a [`GpuModel`] from a render pass

use std::{collections::HashMap, ops::Range, sync::Arc};

use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        model::{MeshData, ModelData},
        scene_graph::Scene,
    },
    pipelines::basic::mk_basic_pipeline,
};

#[derive(Debug)]
pub struct GpuMesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, mesh: &MeshData) -> Option<Self> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return None;
        }
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Some(Self {
            name: mesh.name.clone(),
            vertex_buffer,
            index_buffer,
            num_elements: mesh.indices.len() as u32,
        })
    }
}

#[derive(Debug)]
pub struct GpuModel {
    pub meshes: Vec<GpuMesh>,
}

impl GpuModel {
    pub fn upload(device: &wgpu::Device, model: &ModelData) -> Self {
        Self {
            meshes: model
                .meshes
                .iter()
                .filter_map(|mesh| GpuMesh::upload(device, mesh))
                .collect(),
        }
    }
}

pub trait DrawModel<'a> {
    fn draw_mesh_instanced(&mut self, mesh: &'a GpuMesh, instances: Range<u32>);
    fn draw_model_instanced(&mut self, model: &'a GpuModel, instances: Range<u32>);
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh_instanced(&mut self, mesh: &'b GpuMesh, instances: Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model_instanced(&mut self, model: &'b GpuModel, instances: Range<u32>) {
        for mesh in &model.meshes {
            self.draw_mesh_instanced(mesh, instances.clone());
        }
    }
}

#[derive(Debug)]
struct GpuNode {
    model: usize,
    instance_buffer: wgpu::Buffer,
}

/// Draws a [`Scene`] with the mesh pipeline.
#[derive(Debug)]
pub struct Renderer {
    pipeline: wgpu::RenderPipeline,
    models: Vec<GpuModel>,
    // keyed by the address of the shared ModelData
    uploaded: HashMap<usize, usize>,
    nodes: Vec<GpuNode>,
}

impl Renderer {
    pub fn new(ctx: &Context) -> Self {
        let pipeline = mk_basic_pipeline(
            &ctx.device,
            &ctx.config,
            &ctx.camera.bind_group_layout,
            &ctx.light.bind_group_layout,
        );
        Self {
            pipeline,
            models: Vec::new(),
            uploaded: HashMap::new(),
            nodes: Vec::new(),
        }
    }

    /// Upload nodes added since the last call and refresh every instance buffer.
    pub fn sync(&mut self, ctx: &Context, scene: &Scene) {
        for node in scene.nodes().skip(self.nodes.len()) {
            let key = Arc::as_ptr(&node.model) as usize;
            let model = match self.uploaded.get(&key) {
                Some(model) => *model,
                None => {
                    log::debug!("Uploading {} ({} vertices)", node.name, node.model.vertex_count());
                    self.models.push(GpuModel::upload(&ctx.device, &node.model));
                    self.uploaded.insert(key, self.models.len() - 1);
                    self.models.len() - 1
                }
            };
            let instance_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Instance Buffer", node.name)),
                contents: bytemuck::cast_slice(&[node.instance.to_raw(node.colour)]),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            self.nodes.push(GpuNode {
                model,
                instance_buffer,
            });
        }

        for (gpu, node) in self.nodes.iter().zip(scene.nodes()) {
            let raw: [InstanceRaw; 1] = [node.instance.to_raw(node.colour)];
            ctx.queue
                .write_buffer(&gpu.instance_buffer, 0, bytemuck::cast_slice(&raw));
        }
    }

    pub fn render(&mut self, ctx: &Context, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
        self.sync(ctx, scene);

        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
            render_pass.set_bind_group(1, &ctx.light.bind_group, &[]);
            for node in &self.nodes {
                let Some(model) = self.models.get(node.model) else {
                    continue;
                };
                render_pass.set_vertex_buffer(1, node.instance_buffer.slice(..));
                render_pass.draw_model_instanced(model, 0..1);
            }
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
