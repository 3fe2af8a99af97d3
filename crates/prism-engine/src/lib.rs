//! Prism engine crate.
//!
//! This crate owns the GPU lifecycle pieces used by higher layers:
//! device + surface initialization, shader/pipeline build, uniform and bind
//! group management, camera matrix caching, and the per-frame scene render
//! protocol.
//!
//! Construction order is fixed: [`device::DeviceContext`] →
//! [`device::Surface`] → [`program::Program`] → [`material::Material`] →
//! [`scene::Scene`]. Accessing a derived resource before its builder ran is a
//! sequencing bug and fails with [`device::DeviceError::ResourceNotReady`].

pub mod camera;
pub mod device;
pub mod logging;
pub mod material;
pub mod program;
pub mod scene;
