//! Affine matrices and rectangles in PDF user space

/// A PDF transformation matrix `[a, b, c, d, e, f]`:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f64; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`: apply `self` first, then `other`
    pub fn then(&self, other: &Matrix) -> Matrix {
        let m1 = &self.0;
        let m2 = &other.0;
        Matrix([
            m1[0] * m2[0] + m1[1] * m2[2],
            m1[0] * m2[1] + m1[1] * m2[3],
            m1[2] * m2[0] + m1[3] * m2[2],
            m1[2] * m2[1] + m1[3] * m2[3],
            m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
            m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
        ])
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.0;
        (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
    }

    /// Length of the transformed unit y vector, i.e. the vertical scale
    pub fn vertical_scale(&self) -> f64 {
        let m = &self.0;
        (m[2] * m[2] + m[3] * m[3]).sqrt()
    }

    /// Bounding box of the transformed unit square
    pub fn unit_square_bounds(&self) -> Rect {
        let mut rect = Rect::empty();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
            let (tx, ty) = self.apply(x, y);
            rect.include(tx, ty);
        }
        rect
    }
}

/// Axis-aligned rectangle; `x0 <= x1` and `y0 <= y1` once non-empty
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Rect {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// An inverted rectangle that any `include` call replaces
    pub fn empty() -> Self {
        Rect {
            x0: f64::INFINITY,
            y0: f64::INFINITY,
            x1: f64::NEG_INFINITY,
            y1: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x0 > self.x1 || self.y0 > self.y1
    }

    pub fn include(&mut self, x: f64, y: f64) {
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x);
        self.y1 = self.y1.max(y);
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    /// Whether the horizontal extents of the two rectangles intersect
    pub fn overlaps_horizontally(&self, other: &Rect) -> bool {
        self.x0 <= other.x1 && other.x0 <= self.x1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_then_applies_left_first() {
        let scale = Matrix([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let shift = Matrix::translate(10.0, 5.0);
        // scale, then shift
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        // shift, then scale
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_unit_square_bounds_of_image_matrix() {
        let m = Matrix([200.0, 0.0, 0.0, 100.0, 50.0, 600.0]);
        let r = m.unit_square_bounds();
        assert_eq!(r, Rect::new(50.0, 600.0, 250.0, 700.0));
    }

    #[test]
    fn test_flipped_matrix_still_normalised() {
        let m = Matrix([100.0, 0.0, 0.0, -50.0, 0.0, 300.0]);
        let r = m.unit_square_bounds();
        assert_eq!((r.y0, r.y1), (250.0, 300.0));
    }

    #[test]
    fn test_empty_rect() {
        let mut r = Rect::empty();
        assert!(r.is_empty());
        r.include(3.0, 4.0);
        assert!(!r.is_empty());
        assert_eq!(r.width(), 0.0);
    }
}
