//! Shader module + render pipeline build.

use crate::device::{DeviceContext, DeviceError};
use crate::scene::Vertex;

/// Canonical solid-color shader, matching the documented uniform layout.
pub const BASIC_SHADER: &str = include_str!("shaders/basic.wgsl");

/// Canonical textured shader (uniform buffer @0, texture @1, sampler @2).
pub const TEXTURED_SHADER: &str = include_str!("shaders/textured.wgsl");

struct Built {
    shader: wgpu::ShaderModule,
    pipeline: wgpu::RenderPipeline,
}

/// A compiled shader module and render pipeline pair.
///
/// Either both handles are set (built) or neither is. Shader source is an
/// opaque payload forwarded to the device's compiler; structural build errors
/// (missing device) surface synchronously, while backend validation of the
/// source itself may arrive later on the device error channel.
#[derive(Default)]
pub struct Program {
    built: Option<Built>,
}

impl Program {
    pub fn new() -> Self {
        Self { built: None }
    }

    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// Compiles `shader_source` and builds the render pipeline produced by
    /// `pipeline_fn`.
    ///
    /// `pipeline_fn` must reference the surface's negotiated format for any
    /// color target. Requires a ready context. Once built the program is
    /// immutable: a second call is a no-op success, and rebuilding requires a
    /// fresh instance.
    pub fn build<F>(
        &mut self,
        ctx: &DeviceContext,
        shader_source: &str,
        pipeline_fn: F,
    ) -> Result<(), DeviceError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::ShaderModule) -> wgpu::RenderPipeline,
    {
        if self.built.is_some() {
            return Ok(());
        }

        let device = ctx.device()?;
        let label = ctx.format_label("shader");
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let pipeline = pipeline_fn(device, &shader);
        self.built = Some(Built { shader, pipeline });

        Ok(())
    }

    /// Returns the shader module, or `ResourceNotReady` before build.
    pub fn shader_module(&self) -> Result<&wgpu::ShaderModule, DeviceError> {
        self.built
            .as_ref()
            .map(|built| &built.shader)
            .ok_or(DeviceError::ResourceNotReady("program"))
    }

    /// Returns the render pipeline, or `ResourceNotReady` before build.
    pub fn pipeline(&self) -> Result<&wgpu::RenderPipeline, DeviceError> {
        self.built
            .as_ref()
            .map(|built| &built.pipeline)
            .ok_or(DeviceError::ResourceNotReady("program"))
    }
}

/// Standard auto-layout pipeline over the engine [`Vertex`], rendering to
/// `format`.
///
/// The bind group layout is derived from the shader, so
/// `pipeline.get_bind_group_layout(0)` matches whatever bindings the source
/// declares.
pub fn basic_pipeline(
    device: &wgpu::Device,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("prism pipeline"),
        layout: None,

        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Vertex::layout()],
        },

        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::device::test_context;

    #[test]
    fn accessors_fail_before_build() {
        let program = Program::new();
        assert!(!program.is_built());
        assert!(matches!(
            program.pipeline(),
            Err(DeviceError::ResourceNotReady("program"))
        ));
        assert!(matches!(
            program.shader_module(),
            Err(DeviceError::ResourceNotReady("program"))
        ));
    }

    #[test]
    fn build_requires_a_ready_context() {
        let ctx = DeviceContext::new(
            "test",
            crate::device::DeviceInit {
                backends: wgpu::Backends::empty(),
                ..Default::default()
            },
        );

        let mut program = Program::new();
        let result = program.build(&ctx, BASIC_SHADER, |device, module| {
            basic_pipeline(device, module, wgpu::TextureFormat::Bgra8UnormSrgb)
        });

        assert!(matches!(result, Err(DeviceError::ResourceNotReady(_))));
        assert!(!program.is_built());
    }

    #[test]
    fn built_program_exposes_both_handles() {
        let Some(ctx) = test_context() else {
            return;
        };

        let mut program = Program::new();
        program
            .build(&ctx, BASIC_SHADER, |device, module| {
                basic_pipeline(device, module, wgpu::TextureFormat::Bgra8UnormSrgb)
            })
            .unwrap();

        assert!(program.is_built());
        assert!(program.pipeline().is_ok());
        assert!(program.shader_module().is_ok());
    }

    #[test]
    fn second_build_is_a_no_op() {
        let Some(ctx) = test_context() else {
            return;
        };

        let mut program = Program::new();
        let build = |program: &mut Program| {
            program.build(&ctx, BASIC_SHADER, |device, module| {
                basic_pipeline(device, module, wgpu::TextureFormat::Bgra8UnormSrgb)
            })
        };

        build(&mut program).unwrap();
        build(&mut program).unwrap();
        assert!(program.is_built());
    }
}
