//! Integer pixel space rectangle.

use std::fmt;

/// Axis aligned rectangle in pixel space, `x`/`y` is the upper left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RasterRect {
    pub x: i64,
    pub y: i64,
    pub width: usize,
    pub height: usize,
}

impl RasterRect {
    pub const fn new(x: i64, y: i64, width: usize, height: usize) -> Self {
        RasterRect { x, y, width, height }
    }

    /// Rectangle of the given size starting at pixel (0, 0)
    pub const fn with_size(width: usize, height: usize) -> Self {
        RasterRect::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge, saturates at `i64::MAX` for huge rectangles
    pub fn right(&self) -> i64 {
        far_edge(self.x, self.width)
    }

    /// Exclusive bottom edge, saturates at `i64::MAX` for huge rectangles
    pub fn bottom(&self) -> i64 {
        far_edge(self.y, self.height)
    }

    /// True if this rectangle lies completely inside `other`
    pub fn is_within(&self, other: &RasterRect) -> bool {
        self.x >= other.x && self.y >= other.y && self.right() <= other.right() && self.bottom() <= other.bottom()
    }

    pub fn intersects(&self, other: &RasterRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// The overlapping part of both rectangles, `None` when they only touch or are disjoint.
    pub fn intersection(a: &RasterRect, b: &RasterRect) -> Option<RasterRect> {
        if !a.intersects(b) {
            return None;
        }

        let x = a.x.max(b.x);
        let y = a.y.max(b.y);
        let right = a.right().min(b.right());
        let bottom = a.bottom().min(b.bottom());

        Some(RasterRect::new(x, y, (right - x) as usize, (bottom - y) as usize))
    }

    /// Translates the rectangle so that `origin` becomes the new (0, 0)
    pub fn relative_to(&self, origin_x: i64, origin_y: i64) -> RasterRect {
        RasterRect::new(self.x - origin_x, self.y - origin_y, self.width, self.height)
    }
}

fn far_edge(start: i64, extent: usize) -> i64 {
    i64::try_from(extent).map_or(i64::MAX, |extent| start.saturating_add(extent))
}

impl fmt::Display for RasterRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[x: {}, y: {}, {}x{}]", self.x, self.y, self.width, self.height)
    }
}
