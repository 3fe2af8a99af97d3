use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::context::DeviceContext;
use super::error::DeviceError;

/// Monotonic configuration generation.
///
/// Bumped on every (re)configure; frame views are stamped with the generation
/// they were acquired under, so a view captured before a reconfigure fails
/// validity checks afterwards.
#[derive(Debug, Default)]
struct ConfigGeneration(u64);

impl ConfigGeneration {
    fn bump(&mut self) {
        self.0 += 1;
    }

    fn stamp(&self) -> u64 {
        self.0
    }

    fn matches(&self, stamp: u64) -> bool {
        self.0 == stamp
    }
}

/// The single redraw-trigger slot owned by a surface.
///
/// The owning application registers one callback and invokes it whenever it
/// decides a re-render is warranted. The surface never polls for resize;
/// detecting resize is the frame driver's responsibility.
#[derive(Default)]
struct RedrawSlot {
    callback: Option<Box<dyn FnMut()>>,
}

impl RedrawSlot {
    fn set(&mut self, callback: impl FnMut() + 'static) {
        self.callback = Some(Box::new(callback));
    }

    fn clear(&mut self) {
        self.callback = None;
    }

    fn fire(&mut self) {
        if let Some(callback) = &mut self.callback {
            callback();
        }
    }
}

/// High-level response after a frame-acquisition error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// A drawable bound to a [`DeviceContext`].
///
/// Owned by the application; references but does not own the context. The
/// presentation configuration is valid only after [`Surface::configure`]
/// succeeds and becomes stale on drawable resize; [`Surface::resize`] must
/// run before the surface is used again.
pub struct Surface<'w> {
    surface: wgpu::Surface<'w>,
    config: Option<wgpu::SurfaceConfiguration>,
    size: PhysicalSize<u32>,
    generation: ConfigGeneration,
    redraw: RedrawSlot,
}

/// A single acquired frame, stamped with the surface configuration generation
/// it belongs to.
///
/// Valid only inside one frame's render call: callers must not hold one
/// across a reconfigure or across two frames. [`FrameView::is_current`]
/// reports whether the stamp still matches the surface.
pub struct FrameView {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    generation: u64,
}

impl FrameView {
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Whether this view still belongs to the surface's active configuration.
    pub fn is_current(&self, surface: &Surface<'_>) -> bool {
        surface.generation.matches(self.generation)
    }

    /// Presents the frame.
    pub fn present(self) {
        drop(self.view);
        self.surface_texture.present();
    }
}

impl<'w> Surface<'w> {
    /// Binds a window to a ready device context.
    ///
    /// Reads and stores the window's current pixel size. Fails with
    /// `SurfaceUnsupported` when the drawable cannot produce a presentation
    /// surface, and with `ResourceNotReady` when the context has not finished
    /// initializing.
    pub fn bind(window: &'w Window, ctx: &DeviceContext) -> Result<Self, DeviceError> {
        ctx.device()?;

        let size = window.inner_size();
        let surface = ctx
            .instance()
            .create_surface(window)
            .map_err(|err| DeviceError::SurfaceUnsupported(err.to_string()))?;

        Ok(Self {
            surface,
            config: None,
            size,
            generation: ConfigGeneration::default(),
            redraw: RedrawSlot::default(),
        })
    }

    /// Negotiates the presentation format and configures the surface.
    ///
    /// Idempotent; safe to call again after a resize. Each successful call
    /// starts a new configuration generation, invalidating previously
    /// acquired frame views.
    pub fn configure(&mut self, ctx: &DeviceContext) -> Result<(), DeviceError> {
        let format = ctx.preferred_format(&self.surface)?;
        let device = ctx.device()?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: self.size.width.max(1),
            height: self.size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        self.surface.configure(device, &config);
        self.config = Some(config);
        self.generation.bump();

        Ok(())
    }

    /// Reconfigures the surface after a drawable-size change.
    ///
    /// wgpu does not support configuring a surface with a 0x0 size; in that
    /// case only internal state is updated and configuration is deferred.
    pub fn resize(
        &mut self,
        ctx: &DeviceContext,
        new_size: PhysicalSize<u32>,
    ) -> Result<(), DeviceError> {
        self.size = new_size;

        if new_size.width == 0 || new_size.height == 0 {
            return Ok(());
        }

        let Some(config) = &mut self.config else {
            return Ok(());
        };

        config.width = new_size.width;
        config.height = new_size.height;
        self.surface.configure(ctx.device()?, config);
        self.generation.bump();

        Ok(())
    }

    /// Returns the negotiated format, or `ResourceNotReady` before
    /// [`Surface::configure`] ran.
    pub fn format(&self) -> Result<wgpu::TextureFormat, DeviceError> {
        self.config
            .as_ref()
            .map(|config| config.format)
            .ok_or(DeviceError::ResourceNotReady("surface"))
    }

    /// Current drawable size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Acquires the current frame's render target.
    ///
    /// The returned view is valid only within the active frame; holding it
    /// across a reconfigure or into the next frame is a design error, not a
    /// guarded runtime condition.
    pub fn current_frame_view(&self) -> Result<FrameView, wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Ok(FrameView {
            surface_texture,
            view,
            generation: self.generation.stamp(),
        })
    }

    /// Converts a frame-acquisition error into a higher-level action.
    pub fn handle_surface_error(
        &mut self,
        ctx: &DeviceContext,
        err: wgpu::SurfaceError,
    ) -> SurfaceErrorAction {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                if self.size.width > 0 && self.size.height > 0 {
                    if let (Some(config), Ok(device)) = (&self.config, ctx.device()) {
                        self.surface.configure(device, config);
                        self.generation.bump();
                    }
                }
                SurfaceErrorAction::Reconfigured
            }
            wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
            wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
            wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
        }
    }

    /// Registers (or replaces) the redraw-trigger callback.
    pub fn set_redraw_trigger(&mut self, callback: impl FnMut() + 'static) {
        self.redraw.set(callback);
    }

    /// Removes the redraw-trigger callback.
    pub fn clear_redraw_trigger(&mut self) {
        self.redraw.clear();
    }

    /// Invokes the registered redraw-trigger callback, if any.
    pub fn trigger_redraw(&mut self) {
        self.redraw.fire();
    }
}
