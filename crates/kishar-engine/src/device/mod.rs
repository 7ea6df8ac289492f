//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring surface textures for presentation
//!
//! The renderer façade owns exactly one [`DeviceContext`] for its lifetime.

mod context;
mod init;

pub use context::DeviceContext;
pub use init::DeviceInit;
