//! Minimal window runtime.
//!
//! For applications that don't bring their own event loop: one window, a
//! renderer bound to it, and a redraw-driven frame callback. The renderer
//! borrows the window for its surface, so the two live together in a
//! self-referencing entry managed here.

mod app;
mod runtime;

pub use app::{App, AppControl};
pub use runtime::{Runtime, RuntimeConfig};
