use super::error::{AsyncDeviceError, DeviceError};

/// Initialization parameters for the device layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct DeviceInit {
    /// Backends the instance may select from.
    pub backends: wgpu::Backends,

    /// Adapter power preference.
    pub power_preference: wgpu::PowerPreference,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly
    /// necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,
}

impl Default for DeviceInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}

/// Externally observable initialization state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceStatus {
    Uninitialized,
    AdapterAcquired,
    Ready,
    Failed,
}

enum State {
    Uninitialized,
    AdapterAcquired(wgpu::Adapter),
    Ready {
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
    },
    Failed(DeviceError),
}

/// Owns the wgpu instance and, once ready, the adapter/device/queue.
///
/// Initialization is an ordered, failable state machine:
///
/// ```text
/// Uninitialized → AdapterAcquired → Ready
///           \──────── Failed ────────/
/// ```
///
/// `Failed` is terminal and reachable from any non-ready state. The adapter
/// and device are externally both present (`Ready`) or both absent; the
/// intermediate `AdapterAcquired` state is never exposed through accessors.
pub struct DeviceContext {
    label: String,
    init: DeviceInit,
    instance: wgpu::Instance,
    state: State,
    validation_scope: std::cell::RefCell<Option<wgpu::ErrorScopeGuard>>,
}

impl DeviceContext {
    /// Creates an uninitialized context.
    ///
    /// `label` is prepended to the label of every GPU object created through
    /// this context, which makes backend validation messages traceable.
    pub fn new(label: impl Into<String>, init: DeviceInit) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        Self {
            label: label.into(),
            init,
            instance,
            state: State::Uninitialized,
            validation_scope: std::cell::RefCell::new(None),
        }
    }

    /// Acquires the adapter and logical device.
    ///
    /// Idempotent: calling this on an already-ready context performs no new
    /// acquisition and returns success. A context that previously failed
    /// returns its recorded failure; the engine never retries on its own.
    pub async fn initialize(&mut self) -> Result<(), DeviceError> {
        match &self.state {
            State::Ready { .. } => return Ok(()),
            State::Failed(err) => return Err(err.clone()),
            State::Uninitialized | State::AdapterAcquired(_) => {}
        }

        let adapter = match self
            .instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: self.init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Ok(adapter) => adapter,
            Err(err) => {
                return Err(self.fail(DeviceError::PlatformUnsupported(err.to_string())));
            }
        };

        log::debug!(
            "{}: adapter acquired: {}",
            self.label,
            adapter.get_info().name
        );
        self.state = State::AdapterAcquired(adapter.clone());

        let device_label = self.format_label("device");
        let result = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(&device_label),
                required_features: self.init.required_features,
                required_limits: self.init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await;

        match result {
            Ok((device, queue)) => {
                log::info!("{}: device ready", self.label);
                self.state = State::Ready {
                    adapter,
                    device,
                    queue,
                };
                Ok(())
            }
            Err(err) => Err(self.fail(DeviceError::DeviceAcquisitionFailed(err.to_string()))),
        }
    }

    fn fail(&mut self, err: DeviceError) -> DeviceError {
        log::error!("{}: initialization failed: {err}", self.label);
        self.state = State::Failed(err.clone());
        err
    }

    /// Returns the externally observable initialization state.
    pub fn status(&self) -> DeviceStatus {
        match &self.state {
            State::Uninitialized => DeviceStatus::Uninitialized,
            State::AdapterAcquired(_) => DeviceStatus::AdapterAcquired,
            State::Ready { .. } => DeviceStatus::Ready,
            State::Failed(_) => DeviceStatus::Failed,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Joins the context label with a sub-label using a `.`.
    pub fn format_label(&self, part: &str) -> String {
        if part.is_empty() {
            self.label.clone()
        } else {
            format!("{}.{part}", self.label)
        }
    }

    /// Returns the wgpu instance; used by [`super::Surface`] to bind drawables.
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Returns the adapter, or `ResourceNotReady` before initialization.
    pub fn adapter(&self) -> Result<&wgpu::Adapter, DeviceError> {
        match &self.state {
            State::Ready { adapter, .. } => Ok(adapter),
            _ => Err(DeviceError::ResourceNotReady("device context")),
        }
    }

    /// Returns the logical device, or `ResourceNotReady` before initialization.
    pub fn device(&self) -> Result<&wgpu::Device, DeviceError> {
        match &self.state {
            State::Ready { device, .. } => Ok(device),
            _ => Err(DeviceError::ResourceNotReady("device context")),
        }
    }

    /// Returns the command queue, or `ResourceNotReady` before initialization.
    pub fn queue(&self) -> Result<&wgpu::Queue, DeviceError> {
        match &self.state {
            State::Ready { queue, .. } => Ok(queue),
            _ => Err(DeviceError::ResourceNotReady("device context")),
        }
    }

    /// Capability query: the presentation format a surface should use.
    ///
    /// Prefers an sRGB format when the surface supports one.
    pub fn preferred_format(
        &self,
        surface: &wgpu::Surface<'_>,
    ) -> Result<wgpu::TextureFormat, DeviceError> {
        let adapter = self.adapter()?;
        let caps = surface.get_capabilities(adapter);

        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for format in preferred {
            if caps.formats.contains(&format) {
                return Ok(format);
            }
        }

        caps.formats.first().copied().ok_or_else(|| {
            DeviceError::SurfaceUnsupported("no supported surface formats".into())
        })
    }

    /// Opens a validation error scope on the device.
    ///
    /// Backend validation failures raised by resource-creation calls inside
    /// the scope do not unwind those calls; they are collected and handed back
    /// by [`Self::pop_validation_scope`].
    pub fn push_validation_scope(&self) -> Result<(), DeviceError> {
        let guard = self
            .device()?
            .push_error_scope(wgpu::ErrorFilter::Validation);
        *self.validation_scope.borrow_mut() = Some(guard);
        Ok(())
    }

    /// Closes the innermost validation scope and reports what it caught.
    pub async fn pop_validation_scope(&self) -> Result<Option<AsyncDeviceError>, DeviceError> {
        self.device()?;
        let guard = self.validation_scope.borrow_mut().take();
        let caught = match guard {
            Some(guard) => guard.pop().await,
            None => None,
        };

        Ok(caught.map(|err| {
            let err = AsyncDeviceError::from(err);
            log::error!("{}: {err}", self.label);
            err
        }))
    }
}

/// Acquires a headless device for tests, or `None` when the host has no
/// usable adapter. Callers skip by returning early on `None`.
#[cfg(test)]
pub(crate) fn test_context() -> Option<DeviceContext> {
    let mut ctx = DeviceContext::new("test", DeviceInit::default());
    pollster::block_on(ctx.initialize()).ok()?;
    Some(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsupported_context() -> DeviceContext {
        DeviceContext::new(
            "test",
            DeviceInit {
                backends: wgpu::Backends::empty(),
                ..Default::default()
            },
        )
    }

    // ── failure path ──────────────────────────────────────────────────────

    #[test]
    fn initialize_without_adapter_is_platform_unsupported() {
        let mut ctx = unsupported_context();
        let err = pollster::block_on(ctx.initialize()).unwrap_err();
        assert!(matches!(err, DeviceError::PlatformUnsupported(_)));
        assert_eq!(ctx.status(), DeviceStatus::Failed);
    }

    #[test]
    fn failed_context_exposes_no_resources() {
        let mut ctx = unsupported_context();
        let _ = pollster::block_on(ctx.initialize());

        assert!(ctx.adapter().is_err());
        assert!(ctx.device().is_err());
        assert!(ctx.queue().is_err());
    }

    #[test]
    fn failed_context_returns_recorded_failure_again() {
        let mut ctx = unsupported_context();
        let first = pollster::block_on(ctx.initialize()).unwrap_err();
        let second = pollster::block_on(ctx.initialize()).unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn uninitialized_accessors_fail() {
        let ctx = unsupported_context();
        assert!(matches!(
            ctx.device(),
            Err(DeviceError::ResourceNotReady(_))
        ));
        assert_eq!(ctx.status(), DeviceStatus::Uninitialized);
    }

    // ── ready path (skipped without an adapter) ───────────────────────────

    #[test]
    fn initialize_is_idempotent_once_ready() {
        let Some(mut ctx) = test_context() else {
            return;
        };

        let name_before = ctx.adapter().unwrap().get_info().name;
        pollster::block_on(ctx.initialize()).unwrap();

        assert_eq!(ctx.status(), DeviceStatus::Ready);
        assert_eq!(ctx.adapter().unwrap().get_info().name, name_before);
    }

    #[test]
    fn ready_context_exposes_all_resources() {
        let Some(ctx) = test_context() else {
            return;
        };

        assert!(ctx.adapter().is_ok());
        assert!(ctx.device().is_ok());
        assert!(ctx.queue().is_ok());
    }

    #[test]
    fn validation_scope_catches_deferred_errors() {
        let Some(ctx) = test_context() else {
            return;
        };

        ctx.push_validation_scope().unwrap();

        // An empty usage set is rejected by backend validation; the call
        // itself does not fail synchronously.
        let _buffer = ctx.device().unwrap().create_buffer(&wgpu::BufferDescriptor {
            label: Some("invalid"),
            size: 16,
            usage: wgpu::BufferUsages::empty(),
            mapped_at_creation: false,
        });

        let caught = pollster::block_on(ctx.pop_validation_scope()).unwrap();
        assert!(caught.is_some());
    }

    // ── labels ────────────────────────────────────────────────────────────

    #[test]
    fn format_label_joins_with_a_dot() {
        let ctx = unsupported_context();
        assert_eq!(ctx.format_label("device"), "test.device");
        assert_eq!(ctx.format_label(""), "test");
    }
}
