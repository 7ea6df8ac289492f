use crate::coords::{Rect, Size};

/// Texture coordinates for [`Renderer::draw_texture`].
///
/// Values are normalized image-space coordinates and should lie in
/// [0.0, 1.0] — unless texture repeat is enabled, in which case coordinates
/// outside that range request the image to be tiled. Use
/// [`TexCoords::from_pixel_rect`] to build these from a pixel-space source
/// rectangle.
///
/// [`Renderer::draw_texture`]: crate::render::Renderer::draw_texture
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TexCoords {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TexCoords {
    /// The full image: (0,0) to (1,1).
    pub const FULL: TexCoords = TexCoords {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    #[inline]
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Converts a pixel-space source rect into normalized coordinates.
    ///
    /// Drawing calls expect normalized texture coordinates, but most client
    /// code works in image-specific pixels, like "from 8,8 to 32,64". This
    /// helper converts from the latter to the former. Source rects larger
    /// than the image produce coordinates past 1.0, which is the way to
    /// request tiling when repeat is enabled.
    pub fn from_pixel_rect(source: Rect, texture_size: Size) -> Self {
        let tw = texture_size.width.max(1) as f32;
        let th = texture_size.height.max(1) as f32;

        let left = source.x / tw;
        let top = source.y / th;

        Self {
            left,
            top,
            right: left + source.w / tw,
            bottom: top + source.h / th,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_image_is_unit_square() {
        let tc = TexCoords::from_pixel_rect(Rect::new(0.0, 0.0, 64.0, 32.0), Size::new(64, 32));
        assert_eq!(tc, TexCoords::FULL);
    }

    #[test]
    fn sub_rect_is_normalized() {
        let tc = TexCoords::from_pixel_rect(Rect::new(8.0, 8.0, 24.0, 56.0), Size::new(64, 128));
        assert_eq!(tc.left, 0.125);
        assert_eq!(tc.top, 0.0625);
        assert_eq!(tc.right, 0.5);
        assert_eq!(tc.bottom, 0.5);
    }

    // A source rect wider than the image yields coordinates past 1.0,
    // which requests two horizontal copies under repeat.
    #[test]
    fn oversized_rect_exceeds_unit_range() {
        let tc = TexCoords::from_pixel_rect(Rect::new(0.0, 0.0, 128.0, 32.0), Size::new(64, 32));
        assert_eq!(tc.right, 2.0);
        assert_eq!(tc.bottom, 1.0);
    }
}
