//! Kishar engine crate.
//!
//! A hardware-accelerated 2D renderer: batched sprite drawing, color
//! effects, render targets, and a stack-based state model on top of wgpu.
//! The `window` module provides a minimal winit runtime for applications
//! that don't bring their own event loop.

pub mod coords;
pub mod device;
pub mod image;
pub mod logging;
pub mod render;
pub mod window;
