//! GPU device + surface management.
//!
//! This module is responsible for:
//! - acquiring the wgpu Instance/Adapter/Device/Queue through an ordered,
//!   failable state machine
//! - binding & configuring the presentation surface (swapchain)
//! - acquiring per-frame texture views for rendering

mod context;
mod error;
mod surface;

pub use context::{DeviceContext, DeviceInit, DeviceStatus};
#[cfg(test)]
pub(crate) use context::test_context;
pub use error::{AsyncDeviceError, AsyncErrorKind, DeviceError};
pub use surface::{FrameView, Surface, SurfaceErrorAction};
