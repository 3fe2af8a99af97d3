//! Scene composition and the per-frame render protocol.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::device::{DeviceContext, DeviceError};
use crate::material::Material;

/// Interleaved vertex: position + per-vertex color, 16-byte stride.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
}

impl Vertex {
    pub const fn new(position: [f32; 3], color: [u8; 4]) -> Self {
        Self { position, color }
    }

    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Unorm8x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// The pass-encoder contract [`Scene::render`] drives.
///
/// `wgpu::RenderPass` is the production implementation; tests substitute a
/// recording double to verify the call sequence.
pub trait ScenePass {
    fn set_pipeline(&mut self, pipeline: &wgpu::RenderPipeline);
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &wgpu::Buffer);
    fn set_bind_group(&mut self, index: u32, bind_group: &wgpu::BindGroup);
    fn draw(&mut self, vertex_count: u32);
}

impl ScenePass for wgpu::RenderPass<'_> {
    fn set_pipeline(&mut self, pipeline: &wgpu::RenderPipeline) {
        wgpu::RenderPass::set_pipeline(self, pipeline);
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &wgpu::Buffer) {
        wgpu::RenderPass::set_vertex_buffer(self, slot, buffer.slice(..));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &wgpu::BindGroup) {
        wgpu::RenderPass::set_bind_group(self, index, bind_group, &[]);
    }

    fn draw(&mut self, vertex_count: u32) {
        wgpu::RenderPass::draw(self, 0..vertex_count, 0..1);
    }
}

/// One renderable object: a world matrix, a camera, a material, and an
/// immutable vertex buffer.
///
/// Created once per session; there is no dynamic remeshing.
pub struct Scene {
    world_matrix: Mat4,
    camera: Camera,
    material: Material,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    queue: wgpu::Queue,
}

impl Scene {
    /// Uploads `vertices` and composes the scene.
    ///
    /// Requires a ready context and a built material (which implies a built
    /// program); the lifecycle ordering is enforced here rather than
    /// discovered at draw time.
    pub fn build(
        ctx: &DeviceContext,
        camera: Camera,
        material: Material,
        vertices: &[Vertex],
    ) -> Result<Self, DeviceError> {
        material.bind_group()?;
        let device = ctx.device()?;
        let queue = ctx.queue()?.clone();

        let label = ctx.format_label("scene vertices");
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            world_matrix: Mat4::IDENTITY,
            camera,
            material,
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            queue,
        })
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn set_world_matrix(&mut self, world_matrix: Mat4) {
        self.world_matrix = world_matrix;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Records one frame's draw.
    ///
    /// Refreshes the world/view/projection slices of the material, uploads
    /// the staging block, then issues, in this fixed order: bind pipeline,
    /// bind vertex buffer at slot 0, bind the bind group at group 0, and one
    /// non-indexed draw, once each.
    pub fn render(&mut self, pass: &mut dyn ScenePass) {
        let world = self.world_matrix;
        self.material.set_model(&world);
        let view = self.camera.view_matrix();
        self.material.set_view(&view);
        let projection = self.camera.projection_matrix();
        self.material.set_projection(&projection);

        if self.material.upload_to(&self.queue).is_err() {
            return;
        }
        let Ok(pipeline) = self.material.program().pipeline() else {
            return;
        };
        let Ok(bind_group) = self.material.bind_group() else {
            return;
        };

        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(0, &self.vertex_buffer);
        pass.set_bind_group(0, bind_group);
        pass.draw(self.vertex_count);
    }
}
