use anyhow::Result;

use crate::coords::{Rect, Size, Vec2};
use crate::image::Image;

use super::renderer::Renderer;
use super::resources::TextureHandle;
use super::texcoords::TexCoords;

/// Owned texture.
///
/// A move-only wrapper over a [`TextureHandle`] that ties GPU ownership to
/// a single value: whoever holds the `Texture` is responsible for calling
/// [`destroy`] exactly once. There is no `Clone` — copying a wrapper must
/// not duplicate GPU ownership; share the underlying handle instead when
/// several call sites draw the same image.
///
/// [`destroy`]: Texture::destroy
#[derive(Debug)]
pub struct Texture {
    handle: TextureHandle,
    size: Size,
}

impl Texture {
    /// Uploads `image` and wraps the resulting handle.
    pub fn new(renderer: &mut Renderer<'_>, image: &Image) -> Result<Self> {
        let handle = renderer.create_texture(image)?;
        Ok(Self {
            handle,
            size: image.size(),
        })
    }

    #[inline]
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Draws the whole image at its natural size.
    pub fn draw(&self, renderer: &mut Renderer<'_>, position: Vec2) {
        let dest = Rect::from_origin_size(
            position,
            Vec2::new(self.size.width as f32, self.size.height as f32),
        );
        renderer.draw_texture(self.handle, TexCoords::FULL, dest);
    }

    /// Draws the whole image scaled into `dest`.
    pub fn draw_scaled(&self, renderer: &mut Renderer<'_>, dest: Rect) {
        renderer.draw_texture(self.handle, TexCoords::FULL, dest);
    }

    /// Draws a pixel-space sub-rectangle of the image into `dest`.
    pub fn draw_sub(&self, renderer: &mut Renderer<'_>, source: Rect, dest: Rect) {
        let coords = TexCoords::from_pixel_rect(source, self.size);
        renderer.draw_texture(self.handle, coords, dest);
    }

    /// Releases the GPU memory. Consumes the wrapper.
    pub fn destroy(self, renderer: &mut Renderer<'_>) {
        renderer.destroy_texture(self.handle);
        std::mem::forget(self);
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if cfg!(debug_assertions) {
            log::warn!(
                "Texture {:?} dropped without destroy(); its GPU memory stays allocated \
                 for the renderer's lifetime",
                self.handle
            );
        }
    }
}

/// Owned render target.
///
/// Like [`Texture`], but the underlying image can also be bound as the
/// draw destination via [`Renderer::set_render_target`]. Same move-only
/// ownership rules: destroy exactly once, and never while bound.
#[derive(Debug)]
pub struct RenderTargetTexture {
    handle: TextureHandle,
    size: Size,
}

impl RenderTargetTexture {
    pub fn new(renderer: &mut Renderer<'_>, width: u32, height: u32) -> Result<Self> {
        let handle = renderer.create_render_target_texture(width, height)?;
        Ok(Self {
            handle,
            size: Size::new(width, height),
        })
    }

    #[inline]
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Binds this target as the draw destination.
    pub fn bind(&self, renderer: &mut Renderer<'_>) {
        renderer.set_render_target(Some(self.handle));
    }

    /// Draws the target's contents scaled into `dest`.
    pub fn draw_scaled(&self, renderer: &mut Renderer<'_>, dest: Rect) {
        renderer.draw_texture(self.handle, TexCoords::FULL, dest);
    }

    /// Releases the GPU memory. Consumes the wrapper. The target must not
    /// be bound when destroyed.
    pub fn destroy(self, renderer: &mut Renderer<'_>) {
        renderer.destroy_texture(self.handle);
        std::mem::forget(self);
    }
}

impl Drop for RenderTargetTexture {
    fn drop(&mut self) {
        if cfg!(debug_assertions) {
            log::warn!(
                "RenderTargetTexture {:?} dropped without destroy(); its GPU memory stays \
                 allocated for the renderer's lifetime",
                self.handle
            );
        }
    }
}
