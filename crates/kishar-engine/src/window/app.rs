use winit::event::WindowEvent;

use crate::render::Renderer;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract for the window runtime.
pub trait App {
    /// Called for window events before the runtime's own handling.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per frame.
    ///
    /// `dt` is the time since the previous frame in seconds, clamped to
    /// keep animation stable across stalls. The app issues drawing calls
    /// and is responsible for ending the frame with
    /// [`Renderer::swap_buffers`].
    fn on_frame(&mut self, renderer: &mut Renderer<'_>, dt: f32) -> AppControl;

    /// Called once before the renderer is torn down.
    ///
    /// The place to destroy textures and render targets the app still
    /// owns.
    fn on_exit(&mut self, renderer: &mut Renderer<'_>) {
        let _ = renderer;
    }
}
