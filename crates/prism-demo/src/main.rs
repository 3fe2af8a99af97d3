//! Prism demo: a single-window frame driver over the engine.
//!
//! Owns the pieces the engine treats as external collaborators: the winit
//! event loop, resize detection, the per-frame clear + draw + present cycle,
//! and the decision of when a redraw is warranted.

mod mesh;

use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use ouroboros::self_referencing;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use prism_engine::camera::{Camera, CameraInit, Projection, Screen};
use prism_engine::device::{DeviceContext, DeviceInit, Surface, SurfaceErrorAction};
use prism_engine::logging::{LoggingConfig, init_logging};
use prism_engine::material::{Material, MaterialSpec};
use prism_engine::program::{BASIC_SHADER, Program, basic_pipeline};
use prism_engine::scene::Scene;

/// Consecutive deferred validation errors tolerated before shutdown.
const MAX_VALIDATION_FAILURES: u32 = 3;

#[self_referencing]
struct RenderEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    surface: Surface<'this>,
}

struct DemoApp {
    ctx: DeviceContext,
    entry: Option<RenderEntry>,
    scene: Option<Scene>,
    redraw_wanted: Rc<Cell<bool>>,
    validation_failures: u32,
}

impl DemoApp {
    fn new(ctx: DeviceContext) -> Self {
        Self {
            ctx,
            entry: None,
            scene: None,
            redraw_wanted: Rc::new(Cell::new(false)),
            validation_failures: 0,
        }
    }

    /// Configures the surface and builds program → material → scene.
    fn setup(&self, entry: &mut RenderEntry) -> Result<Scene> {
        entry.with_surface_mut(|surface| surface.configure(&self.ctx))?;

        let wanted = Rc::clone(&self.redraw_wanted);
        entry.with_surface_mut(|surface| {
            surface.set_redraw_trigger(move || wanted.set(true));
        });

        let format = entry.with_surface(|surface| surface.format())?;

        let mut program = Program::new();
        program.build(&self.ctx, BASIC_SHADER, |device, module| {
            basic_pipeline(device, module, format)
        })?;

        let mut material = Material::new(program);
        material.build(
            &self.ctx,
            MaterialSpec {
                color: Some([0.35, 0.65, 0.9, 1.0]),
                texture: None,
            },
        )?;

        let size = entry.with_surface(|surface| surface.size());
        let camera = Camera::new(CameraInit {
            position: Vec3::new(0.0, 0.0, 3.0),
            screen: Screen::new(0.0, 0.0, size.width as f32, size.height as f32),
            projection: Projection::Perspective,
            ..Default::default()
        });

        // `prism-demo circle` draws the ring mesh instead of the quad.
        let vertices = match std::env::args().nth(1).as_deref() {
            Some("circle") => mesh::circle(&mesh::CircleSpec {
                radius: 0.9,
                inner_radius: 0.45,
                ..Default::default()
            }),
            _ => mesh::quad(1.0),
        };

        let mut scene = Scene::build(&self.ctx, camera, material, &vertices)?;
        scene.set_world_matrix(Mat4::from_scale(Vec3::splat(0.75)));

        Ok(scene)
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        if let Err(err) = entry.with_surface_mut(|surface| surface.resize(&self.ctx, new_size)) {
            log::error!("surface reconfigure failed: {err}");
            return;
        }

        if let Some(scene) = self.scene.as_mut() {
            scene.camera_mut().set_screen(Screen::new(
                0.0,
                0.0,
                new_size.width as f32,
                new_size.height as f32,
            ));
        }

        // The driver, not the surface, decides that a resize warrants a
        // re-render; the registered trigger carries that decision.
        entry.with_surface_mut(|surface| surface.trigger_redraw());
        if self.redraw_wanted.take() {
            entry.with_window(|window| window.request_redraw());
        }
    }

    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        let Some(scene) = self.scene.as_mut() else {
            return;
        };

        if self.ctx.push_validation_scope().is_err() {
            return;
        }

        let frame = match entry.with_surface(|surface| surface.current_frame_view()) {
            Ok(frame) => frame,
            Err(err) => {
                let action =
                    entry.with_surface_mut(|surface| surface.handle_surface_error(&self.ctx, err));
                match action {
                    SurfaceErrorAction::Fatal => {
                        log::error!("fatal surface error; exiting");
                        event_loop.exit();
                    }
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        entry.with_window(|window| window.request_redraw());
                    }
                }
                let _ = pollster::block_on(self.ctx.pop_validation_scope());
                return;
            }
        };

        let Ok(device) = self.ctx.device() else {
            return;
        };
        let Ok(queue) = self.ctx.queue() else {
            return;
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("prism-demo encoder"),
        });

        // Pass scope: the encoder borrow must end before submit() takes it.
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("prism-demo pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.3,
                            g: 0.3,
                            b: 0.3,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            scene.render(&mut rpass);
        }

        queue.submit(std::iter::once(encoder.finish()));
        entry.with_window(|window| window.pre_present_notify());
        frame.present();

        match pollster::block_on(self.ctx.pop_validation_scope()) {
            Ok(Some(err)) => {
                self.validation_failures += 1;
                log::warn!(
                    "frame completed with a deferred device error ({}/{MAX_VALIDATION_FAILURES}): {err}",
                    self.validation_failures
                );
                if self.validation_failures >= MAX_VALIDATION_FAILURES {
                    log::error!("repeated device validation failures; shutting down");
                    event_loop.exit();
                }
            }
            Ok(None) => self.validation_failures = 0,
            Err(_) => {}
        }
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("prism demo")
            .with_inner_size(LogicalSize::new(960.0, 720.0));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => window,
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        let ctx = &self.ctx;
        let mut entry = RenderEntryBuilder {
            window,
            surface_builder: |window| {
                Surface::bind(window, ctx).expect("surface binding failed for window")
            },
        }
        .build();

        match self.setup(&mut entry) {
            Ok(scene) => {
                self.scene = Some(scene);
                self.entry = Some(entry);
            }
            Err(err) => {
                log::error!("initialization failed: {err:#}");
                event_loop.exit();
                return;
            }
        }

        if let Some(entry) = &self.entry {
            entry.with_window(|window| window.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw; invalidation-driven scheduling can come later.
        if let Some(entry) = &self.entry {
            entry.with_window(|window| window.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(new_size) => self.handle_resize(new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = self
                    .entry
                    .as_ref()
                    .map(|entry| entry.with_window(|window| window.inner_size()));
                if let Some(new_size) = new_size {
                    self.handle_resize(new_size);
                }
            }

            WindowEvent::RedrawRequested => self.render_frame(event_loop),

            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut ctx = DeviceContext::new("prism-demo", DeviceInit::default());
    pollster::block_on(ctx.initialize()).context("GPU initialization failed")?;

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut app = DemoApp::new(ctx);

    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;

    Ok(())
}
