use super::Vec2;

/// Axis-aligned rectangle in target pixels, top-left origin.
///
/// Drawing calls take destination rectangles of this type; width and height
/// may be negative (the rectangle then extends left/up from `x`/`y`), and
/// [`normalized`] flips such a rectangle into its canonical form.
///
/// [`normalized`]: Rect::normalized
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            w: size.x,
            h: size.y,
        }
    }

    /// Top-left corner.
    #[inline]
    pub const fn origin(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Extent as a vector.
    #[inline]
    pub const fn size(self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    #[inline]
    pub const fn min(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub const fn max(self) -> Vec2 {
        Vec2::new(self.x + self.w, self.y + self.h)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Canonical form: the same area with non-negative width and height.
    #[inline]
    pub fn normalized(self) -> Self {
        let (x, w) = flip_span(self.x, self.w);
        let (y, h) = flip_span(self.y, self.h);
        Rect::new(x, y, w, h)
    }

    /// Half-open containment test: the min edges belong to the rectangle,
    /// the max edges do not.
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        let r = self.normalized();
        (r.x..r.x + r.w).contains(&p.x) && (r.y..r.y + r.h).contains(&p.y)
    }

    /// Overlapping area of two rectangles, if it has positive size.
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let (a, b) = (self.normalized(), other.normalized());

        let x = a.x.max(b.x);
        let y = a.y.max(b.y);
        let w = (a.x + a.w).min(b.x + b.w) - x;
        let h = (a.y + a.h).min(b.y + b.h) - y;

        (w > 0.0 && h > 0.0).then(|| Rect::new(x, y, w, h))
    }
}

#[inline]
fn flip_span(start: f32, extent: f32) -> (f32, f32) {
    if extent < 0.0 {
        (start + extent, -extent)
    } else {
        (start, extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── normalized ────────────────────────────────────────────────────────

    #[test]
    fn normalized_keeps_canonical_rects() {
        let r = Rect::new(1.0, 2.0, 10.0, 20.0);
        assert_eq!(r.normalized(), r);
    }

    #[test]
    fn normalized_flips_negative_extents() {
        let n = Rect::new(10.0, 10.0, -4.0, -3.0).normalized();
        assert_eq!(n, Rect::new(6.0, 7.0, 4.0, 3.0));
    }

    #[test]
    fn min_max_span_the_rect() {
        let r = Rect::new(2.0, 3.0, 10.0, 20.0);
        assert_eq!(r.min(), Vec2::new(2.0, 3.0));
        assert_eq!(r.max(), Vec2::new(12.0, 23.0));
    }

    // ── contains ──────────────────────────────────────────────────────────

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Vec2::zero()));
        assert!(r.contains(Vec2::new(9.9, 9.9)));
        assert!(!r.contains(Vec2::new(10.0, 10.0)));
        assert!(!r.contains(Vec2::new(-0.1, 5.0)));
    }

    // ── intersect ─────────────────────────────────────────────────────────

    #[test]
    fn intersect_overlapping() {
        let i = Rect::new(0.0, 0.0, 10.0, 10.0)
            .intersect(Rect::new(5.0, 5.0, 10.0, 10.0))
            .unwrap();
        assert_eq!(i, Rect::new(5.0, 5.0, 5.0, 5.0));
    }

    #[test]
    fn intersect_contained_returns_inner() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        let inner = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(outer.intersect(inner), Some(inner));
    }

    #[test]
    fn intersect_disjoint_or_touching_is_none() {
        let a = Rect::new(0.0, 0.0, 5.0, 5.0);
        assert!(a.intersect(Rect::new(20.0, 20.0, 5.0, 5.0)).is_none());
        // Sharing an edge is a zero-width overlap, not an intersection.
        assert!(a.intersect(Rect::new(5.0, 0.0, 5.0, 5.0)).is_none());
    }

    // ── is_empty ──────────────────────────────────────────────────────────

    #[test]
    fn zero_or_negative_extent_is_empty() {
        assert!(Rect::new(0.0, 0.0, 0.0, 5.0).is_empty());
        assert!(Rect::new(0.0, 0.0, 5.0, -1.0).is_empty());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_empty());
    }
}
