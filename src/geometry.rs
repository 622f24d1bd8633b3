// =============================================================================
// GEOMETRY.RS — Pixel rectangles
//
// Shared by the registry (sprite offsets), the packer (sheet placements) and
// ingestion (sprite sheet cells):
// - Signed origin, unsigned extent
// - Overlap and containment tests used to check packing results
// =============================================================================

/// Axis-aligned pixel rectangle: origin `(x, y)`, extent `w × h`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w as i32
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.h as i32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// True when the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_exclusive() {
        let r = Rect::new(-2, 3, 4, 5);
        assert_eq!(r.right(), 2);
        assert_eq!(r.bottom(), 8);
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0, 0, 16, 16);
        let b = Rect::new(16, 0, 16, 16);
        assert!(!a.intersects(&b));
        assert!(!b.intersects(&a));
    }

    #[test]
    fn overlapping_rects_intersect() {
        let a = Rect::new(0, 0, 16, 16);
        let b = Rect::new(15, 15, 4, 4);
        assert!(a.intersects(&b));
    }

    #[test]
    fn empty_rect_never_intersects() {
        let a = Rect::new(0, 0, 16, 16);
        let b = Rect::new(4, 4, 0, 8);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn containment() {
        let sheet = Rect::new(0, 0, 64, 64);
        assert!(sheet.contains(&Rect::new(48, 0, 16, 16)));
        assert!(!sheet.contains(&Rect::new(56, 0, 16, 16)));
    }
}
