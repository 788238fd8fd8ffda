//! Integer rectangles and the affine helpers shared by the input queues.

use glam::{Affine2, IVec2, Vec2};

/// Axis-aligned integer rectangle, `min` inclusive and `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub min: IVec2,
    pub max: IVec2,
}

impl Rect {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            min: IVec2::new(x0, y0),
            max: IVec2::new(x1, y1),
        }
    }

    /// Rectangle of the given size anchored at the origin.
    pub const fn from_size(size: IVec2) -> Self {
        Self {
            min: IVec2::ZERO,
            max: size,
        }
    }

    pub fn size(&self) -> IVec2 {
        self.max - self.min
    }

    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    /// Half-open containment test in floating point space.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x as f32
            && p.x < self.max.x as f32
            && p.y >= self.min.y as f32
            && p.y < self.max.y as f32
    }

    pub fn center(&self) -> Vec2 {
        (self.min.as_vec2() + self.max.as_vec2()) * 0.5
    }

    pub fn translate(&self, offset: IVec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn intersect(&self, other: &Rect) -> Self {
        let r = Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        if r.is_empty() {
            Self::default()
        } else {
            r
        }
    }

    /// Bounding box of this rectangle after transformation by `t`.
    pub fn transform(&self, t: &Affine2) -> Self {
        let corners = [
            self.min.as_vec2(),
            Vec2::new(self.max.x as f32, self.min.y as f32),
            Vec2::new(self.min.x as f32, self.max.y as f32),
            self.max.as_vec2(),
        ];
        let mut lo = Vec2::splat(f32::INFINITY);
        let mut hi = Vec2::splat(f32::NEG_INFINITY);
        for c in corners {
            let p = t.transform_point2(c);
            lo = lo.min(p);
            hi = hi.max(p);
        }
        Self {
            min: lo.floor().as_ivec2(),
            max: hi.ceil().as_ivec2(),
        }
    }
}

/// Maps a point through the inverse of `t`.
///
/// Degenerate transforms collapse every point onto the origin rather than
/// producing NaN coordinates.
pub(crate) fn inverse_transform(t: &Affine2, p: Vec2) -> Vec2 {
    if t.matrix2.determinant() == 0.0 {
        return Vec2::ZERO;
    }
    t.inverse().transform_point2(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_half_open() {
        let r = Rect::new(0, 0, 100, 50);
        assert!(r.contains(Vec2::new(0.0, 0.0)));
        assert!(r.contains(Vec2::new(99.9, 49.9)));
        assert!(!r.contains(Vec2::new(100.0, 25.0)));
        assert!(!r.contains(Vec2::new(50.0, 50.0)));
    }

    #[test]
    fn test_rect_transform_bounds() {
        let r = Rect::new(0, 0, 10, 20);
        let t = Affine2::from_translation(Vec2::new(5.0, -5.0));
        assert_eq!(r.transform(&t), Rect::new(5, -5, 15, 15));
    }

    #[test]
    fn test_union_ignores_empty() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.union(&Rect::default()), a);
        assert_eq!(a.union(&Rect::new(5, 5, 20, 30)), Rect::new(0, 0, 20, 30));
    }

    #[test]
    fn test_inverse_transform_degenerate() {
        let t = Affine2::from_scale(Vec2::ZERO);
        assert_eq!(inverse_transform(&t, Vec2::new(3.0, 4.0)), Vec2::ZERO);
    }
}
