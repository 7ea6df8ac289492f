use crate::coords::{ColorRgba, Rect, Vec2};

use super::resources::TextureHandle;

/// The full mutable render state, snapshotted by push/pop.
///
/// Defaults are the neutral values: transparent overlay, white modulation,
/// repeat off, identity transform, no clipping, screen as the draw target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderState {
    /// Added on top of texture colors; the texel's alpha is preserved.
    pub overlay_color: ColorRgba,
    /// Multiplied into texture colors.
    pub color_modulation: ColorRgba,
    /// When set, texture coordinates outside [0,1] tile the image.
    pub texture_repeat: bool,
    /// Offset added to all coordinates, after scaling.
    pub translation: Vec2,
    /// Scale factor applied to all coordinates, before translation.
    pub scale: Vec2,
    /// Restricts drawing to this rectangle. `None` = no clipping.
    pub clip_rect: Option<Rect>,
    /// Current draw destination. `None` = the back buffer.
    pub target: Option<TextureHandle>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            overlay_color: ColorRgba::TRANSPARENT,
            color_modulation: ColorRgba::WHITE,
            texture_repeat: false,
            translation: Vec2::zero(),
            scale: Vec2::splat(1.0),
            clip_rect: None,
            target: None,
        }
    }
}

impl RenderState {
    /// Maps a point through the global transform: scale first, then
    /// translation. Every vertex position goes through this before it is
    /// handed to the GPU.
    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        p.scaled(self.scale) + self.translation
    }

    /// Maps a rectangle through the global transform.
    #[inline]
    pub fn transform_rect(&self, r: Rect) -> Rect {
        Rect::from_origin_size(self.transform_point(r.origin()), r.size().scaled(self.scale))
    }

    /// True if switching from `self` to `other` invalidates an open batch.
    ///
    /// The transform is applied CPU-side before vertices enter a batch, so
    /// translation/scale differences do not count — only the fields that
    /// feed shader-variant selection, the scissor rect, and the draw
    /// destination do. Restoring an identical state never forces a flush.
    pub(crate) fn breaks_batch_with(&self, other: &RenderState) -> bool {
        self.overlay_color != other.overlay_color
            || self.color_modulation != other.color_modulation
            || self.texture_repeat != other.texture_repeat
            || self.clip_rect != other.clip_rect
            || self.target != other.target
    }
}

/// Saved state snapshots for push/pop.
///
/// Push and pop must be balanced; popping with no snapshot saved is a fatal
/// caller bug and panics rather than handing back stale or default state.
#[derive(Debug, Default)]
pub(crate) struct StateStack {
    saved: Vec<RenderState>,
}

impl StateStack {
    pub(crate) fn push(&mut self, current: RenderState) {
        self.saved.push(current);
    }

    pub(crate) fn pop(&mut self) -> RenderState {
        self.saved
            .pop()
            .expect("pop_state called with no saved state; push/pop calls must be balanced")
    }

    pub(crate) fn clear(&mut self) {
        self.saved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── transform ─────────────────────────────────────────────────────────

    #[test]
    fn transform_scales_before_translating() {
        let state = RenderState {
            scale: Vec2::new(2.0, 2.0),
            translation: Vec2::new(10.0, 5.0),
            ..Default::default()
        };

        assert_eq!(state.transform_point(Vec2::zero()), Vec2::new(10.0, 5.0));
        assert_eq!(
            state.transform_point(Vec2::new(3.0, 4.0)),
            Vec2::new(16.0, 13.0)
        );
    }

    #[test]
    fn transform_rect_scales_size() {
        let state = RenderState {
            scale: Vec2::new(2.0, 3.0),
            translation: Vec2::new(1.0, 1.0),
            ..Default::default()
        };

        let r = state.transform_rect(Rect::new(1.0, 1.0, 10.0, 10.0));
        assert_eq!(r, Rect::new(3.0, 4.0, 20.0, 30.0));
    }

    #[test]
    fn default_transform_is_identity() {
        let state = RenderState::default();
        let p = Vec2::new(12.5, -3.0);
        assert_eq!(state.transform_point(p), p);
    }

    // ── batch invalidation ────────────────────────────────────────────────

    #[test]
    fn identical_states_do_not_break_batch() {
        let a = RenderState::default();
        let b = RenderState::default();
        assert!(!a.breaks_batch_with(&b));
    }

    #[test]
    fn transform_only_difference_does_not_break_batch() {
        let a = RenderState::default();
        let b = RenderState {
            translation: Vec2::new(50.0, 0.0),
            scale: Vec2::new(4.0, 4.0),
            ..Default::default()
        };
        assert!(!a.breaks_batch_with(&b));
    }

    #[test]
    fn effect_and_clip_differences_break_batch() {
        let base = RenderState::default();

        let modulated = RenderState {
            color_modulation: ColorRgba::new(1.0, 0.0, 0.0, 1.0),
            ..Default::default()
        };
        assert!(base.breaks_batch_with(&modulated));

        let clipped = RenderState {
            clip_rect: Some(Rect::new(0.0, 0.0, 8.0, 8.0)),
            ..Default::default()
        };
        assert!(base.breaks_batch_with(&clipped));
    }

    // ── stack ─────────────────────────────────────────────────────────────

    #[test]
    fn stack_restores_in_lifo_order() {
        let mut stack = StateStack::default();

        let first = RenderState {
            texture_repeat: true,
            ..Default::default()
        };
        let second = RenderState {
            overlay_color: ColorRgba::WHITE,
            ..Default::default()
        };

        stack.push(first);
        stack.push(second);

        assert_eq!(stack.pop(), second);
        assert_eq!(stack.pop(), first);
    }

    #[test]
    fn round_trip_restores_prior_values() {
        let mut stack = StateStack::default();

        let mut current = RenderState {
            scale: Vec2::new(1.5, 1.5),
            overlay_color: ColorRgba::new(0.0, 0.0, 1.0, 0.25),
            ..Default::default()
        };

        stack.push(current);
        current.scale = Vec2::new(3.0, 3.0);
        current.overlay_color = ColorRgba::new(1.0, 0.0, 0.0, 1.0);
        current = stack.pop();

        assert_eq!(current.scale, Vec2::new(1.5, 1.5));
        assert_eq!(current.overlay_color, ColorRgba::new(0.0, 0.0, 1.0, 0.25));
    }

    #[test]
    #[should_panic(expected = "push/pop calls must be balanced")]
    fn unbalanced_pop_panics() {
        let mut stack = StateStack::default();
        stack.pop();
    }
}
