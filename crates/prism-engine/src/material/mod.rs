//! Material: uniform buffer + bind group management.

mod texture;
mod uniform;

pub use texture::{GpuTexture, TextureError, TextureLoader};
pub use uniform::{
    COLOR_OFFSET, MODEL_OFFSET, PROJECTION_OFFSET, UNIFORM_BYTES, UNIFORM_FLOATS, UniformQueue,
    UniformStaging, VIEW_OFFSET,
};

use glam::Mat4;

use crate::device::{DeviceContext, DeviceError};
use crate::program::Program;

/// Build parameters for a material.
#[derive(Default)]
pub struct MaterialSpec {
    /// Tint written into the staging color slice at build time.
    pub color: Option<[f32; 4]>,

    /// Texture + sampler bound after the uniform buffer in group 0.
    ///
    /// The program's shader must declare the matching bindings
    /// (see `program::TEXTURED_SHADER`).
    pub texture: Option<GpuTexture>,
}

struct Built {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    // Kept alive for the lifetime of the bind group that references it.
    _texture: Option<GpuTexture>,
}

/// Owns a program, a CPU staging array, and the GPU uniform buffer + bind
/// group built against the program's group-0 layout.
///
/// Mutating a staging sub-view updates only the CPU side; the GPU buffer
/// reflects it only after [`Material::upload_to`]. Omitting the upload before
/// the next draw renders stale data; there is no automatic dirty-tracking.
pub struct Material {
    program: Program,
    staging: UniformStaging,
    built: Option<Built>,
}

impl Material {
    /// The staging array exists immediately; GPU resources appear on
    /// [`Material::build`].
    pub fn new(program: Program) -> Self {
        Self {
            program,
            staging: UniformStaging::new(),
            built: None,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// Allocates the uniform buffer and creates the bind group.
    ///
    /// Requires a ready context and a built program. Binding order in group
    /// 0: uniform buffer @0, then texture view @1 and sampler @2 when a
    /// texture is supplied. A second call is a no-op success.
    pub fn build(&mut self, ctx: &DeviceContext, spec: MaterialSpec) -> Result<(), DeviceError> {
        if self.built.is_some() {
            return Ok(());
        }

        let device = ctx.device()?;
        let pipeline = self.program.pipeline()?;

        if let Some(color) = spec.color {
            self.staging.set_color(color);
        }

        let buffer_label = ctx.format_label("uniforms");
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&buffer_label),
            size: UNIFORM_BYTES,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }];
        if let Some(texture) = &spec.texture {
            entries.push(wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            });
        }

        let group_label = ctx.format_label("material bind group");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&group_label),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &entries,
        });

        self.built = Some(Built {
            buffer,
            bind_group,
            _texture: spec.texture,
        });

        Ok(())
    }

    // ── staging sub-views ─────────────────────────────────────────────────

    pub fn staging(&self) -> &UniformStaging {
        &self.staging
    }

    pub fn staging_mut(&mut self) -> &mut UniformStaging {
        &mut self.staging
    }

    pub fn set_model(&mut self, m: &Mat4) {
        self.staging.set_model(m);
    }

    pub fn set_view(&mut self, m: &Mat4) {
        self.staging.set_view(m);
    }

    pub fn set_projection(&mut self, m: &Mat4) {
        self.staging.set_projection(m);
    }

    pub fn set_color(&mut self, color: [f32; 4]) {
        self.staging.set_color(color);
    }

    // ── GPU side ──────────────────────────────────────────────────────────

    /// Pushes the whole staging block to the GPU buffer.
    ///
    /// This is the only point at which staging mutations become visible to
    /// the GPU.
    pub fn upload_to<Q: UniformQueue + ?Sized>(&self, queue: &Q) -> Result<(), DeviceError> {
        let built = self
            .built
            .as_ref()
            .ok_or(DeviceError::ResourceNotReady("material"))?;

        queue.write_uniform(&built.buffer, 0, self.staging.as_bytes());
        Ok(())
    }

    /// Returns the bind group, or `ResourceNotReady` before build.
    pub fn bind_group(&self) -> Result<&wgpu::BindGroup, DeviceError> {
        self.built
            .as_ref()
            .map(|built| &built.bind_group)
            .ok_or(DeviceError::ResourceNotReady("material"))
    }

    /// Returns the uniform buffer, or `ResourceNotReady` before build.
    pub fn uniform_buffer(&self) -> Result<&wgpu::Buffer, DeviceError> {
        self.built
            .as_ref()
            .map(|built| &built.buffer)
            .ok_or(DeviceError::ResourceNotReady("material"))
    }
}
