//! The 2D rendering engine.
//!
//! [`Renderer`] is the entry point: an immediate-mode drawing API over wgpu
//! with implicit batching, a push/pop render-state model, and handle-based
//! texture management. [`Texture`] and [`RenderTargetTexture`] are the
//! recommended owned wrappers over raw handles.
//!
//! Internals:
//! - `batch` buffers vertices until the texture/variant/target key breaks
//! - `shader` selects one of a fixed set of GPU programs from render state
//! - `state` holds the snapshot/restore state model
//! - `resources` maps opaque handles to GPU images via a generation arena

mod arena;
mod batch;
mod renderer;
mod resources;
mod shader;
mod state;
mod texcoords;
mod texture;

pub use renderer::{Renderer, StateSaver};
pub use resources::TextureHandle;
pub use state::RenderState;
pub use texcoords::TexCoords;
pub use texture::{RenderTargetTexture, Texture};
