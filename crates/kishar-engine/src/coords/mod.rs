//! Coordinate and geometry types shared across the engine.
//!
//! Canonical CPU space:
//! - Pixels of the current render target
//! - Origin top-left
//! - +X right, +Y down
//!
//! The vertex shaders convert to NDC using a per-target viewport uniform.

mod color;
mod rect;
mod size;
mod vec2;

pub use color::ColorRgba;
pub use rect::Rect;
pub use size::Size;
pub use vec2::Vec2;
