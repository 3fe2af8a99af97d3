use thiserror::Error;

/// Synchronous structural errors raised by the device/resource lifecycle.
///
/// Initialization failures (`PlatformUnsupported`, `DeviceAcquisitionFailed`,
/// `SurfaceUnsupported`) are terminal for the affected entity and are surfaced
/// to the caller directly; the engine never retries on its own.
/// `ResourceNotReady` indicates a sequencing bug: a derived resource was
/// accessed before its builder ran.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    /// No graphics adapter could be obtained from the platform.
    #[error("no compatible graphics adapter is available: {0}")]
    PlatformUnsupported(String),

    /// The adapter refused to provide a logical device.
    #[error("adapter refused to provide a logical device: {0}")]
    DeviceAcquisitionFailed(String),

    /// The drawable cannot provide a presentation surface.
    #[error("drawable cannot provide a presentation surface: {0}")]
    SurfaceUnsupported(String),

    /// A derived resource was accessed before its builder ran.
    #[error("{0} was accessed before it was built")]
    ResourceNotReady(&'static str),
}

/// Classification of a deferred device error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AsyncErrorKind {
    Validation,
    OutOfMemory,
    Internal,
}

/// A backend error delivered through the device's error-scope channel.
///
/// Resource-creation calls after the device is ready are synchronous from the
/// caller's perspective, but the backend may report validation failures later.
/// These arrive here instead of unwinding the call that triggered them. The
/// frame driver should treat repeated occurrences as grounds to tear down and
/// reinitialize the device.
#[derive(Debug, Clone, Error)]
#[error("deferred device error ({kind:?}): {description}")]
pub struct AsyncDeviceError {
    pub kind: AsyncErrorKind,
    pub description: String,
}

impl From<wgpu::Error> for AsyncDeviceError {
    fn from(err: wgpu::Error) -> Self {
        let kind = match &err {
            wgpu::Error::Validation { .. } => AsyncErrorKind::Validation,
            wgpu::Error::OutOfMemory { .. } => AsyncErrorKind::OutOfMemory,
            _ => AsyncErrorKind::Internal,
        };

        Self {
            kind,
            description: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_not_ready_names_the_resource() {
        let err = DeviceError::ResourceNotReady("program");
        assert!(err.to_string().contains("program"));
    }

    #[test]
    fn device_errors_are_cloneable() {
        // A failed context stores its error and returns it again on every
        // subsequent initialize call.
        let err = DeviceError::PlatformUnsupported("no adapter".into());
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }
}
