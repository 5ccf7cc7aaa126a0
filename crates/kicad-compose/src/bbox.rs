//! Axis-aligned 2D bounding box over point sets.
//!
//! A box starts out empty and becomes valid on the first `envelop` with at
//! least one point. Queries on an empty box return zero/`None` sentinels
//! rather than failing. Rotation re-derives the axis-aligned envelope of the
//! rotated corners, so iterated rotations accumulate an ever-looser bound.

#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    valid: bool,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBox {
    /// An empty (invalid) box.
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
            valid: false,
        }
    }

    pub fn from_points(points: &[[f64; 2]]) -> Self {
        let mut bb = Self::new();
        bb.envelop(points);
        bb
    }

    /// Grow the box to contain `points`. An empty slice is a no-op. The box
    /// only ever grows or stays the same.
    pub fn envelop(&mut self, points: &[[f64; 2]]) {
        for p in points {
            self.min_x = self.min_x.min(p[0]);
            self.min_y = self.min_y.min(p[1]);
            self.max_x = self.max_x.max(p[0]);
            self.max_y = self.max_y.max(p[1]);
            self.valid = true;
        }
    }

    /// Merge another box into this one.
    pub fn envelop_box(&mut self, other: &BoundingBox) {
        if let Some(corners) = other.corners() {
            self.envelop(&corners);
        }
    }

    /// Move the box by `[dx, dy]`. No-op on an empty box.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        if self.valid {
            self.min_x += dx;
            self.max_x += dx;
            self.min_y += dy;
            self.max_y += dy;
        }
    }

    /// Rotate the box around the origin by `angle` degrees: the four corners
    /// are rotated and the box becomes their new axis-aligned envelope.
    pub fn rotate(&mut self, angle: f64) {
        if let Some(corners) = self.corners() {
            let rotated: Vec<[f64; 2]> = corners
                .iter()
                .map(|c| rotate_point(*c, angle))
                .collect();
            self.reset();
            self.envelop(&rotated);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The four corners, counter-clockwise from the minimum, or `None` for
    /// an empty box.
    pub fn corners(&self) -> Option<[[f64; 2]; 4]> {
        if !self.valid {
            return None;
        }
        Some([
            [self.min_x, self.min_y],
            [self.min_x, self.max_y],
            [self.max_x, self.max_y],
            [self.max_x, self.min_y],
        ])
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    /// X-axis extent, 0 for an empty box.
    pub fn width(&self) -> f64 {
        if self.valid {
            self.max_x - self.min_x
        } else {
            0.0
        }
    }

    /// Y-axis extent, 0 for an empty box.
    pub fn height(&self) -> f64 {
        if self.valid {
            self.max_y - self.min_y
        } else {
            0.0
        }
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center point, or `None` for an empty box.
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.valid {
            Some((
                self.min_x + self.width() / 2.0,
                self.min_y + self.height() / 2.0,
            ))
        } else {
            None
        }
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.valid {
            return write!(f, "boundingbox empty");
        }
        write!(
            f,
            "boundingbox([{:.2}x, {:.2}y] -> [{:.2}x, {:.2}y])",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Rotate a point around the origin by `angle` degrees.
pub fn rotate_point(p: [f64; 2], angle: f64) -> [f64; 2] {
    let rad = angle.to_radians();
    let (sin, cos) = rad.sin_cos();
    [p[0] * cos - p[1] * sin, p[0] * sin + p[1] * cos]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_queries() {
        let bb = BoundingBox::new();
        assert!(!bb.valid());
        assert_eq!(bb.width(), 0.0);
        assert_eq!(bb.height(), 0.0);
        assert_eq!(bb.area(), 0.0);
        assert_eq!(bb.center(), None);
        assert_eq!(bb.corners(), None);
    }

    #[test]
    fn test_envelop_empty_is_noop() {
        let mut bb = BoundingBox::new();
        bb.envelop(&[]);
        assert!(!bb.valid());
    }

    #[test]
    fn test_envelop_monotonic() {
        let mut bb = BoundingBox::from_points(&[[0.0, 0.0], [1.0, 1.0]]);
        let a1 = bb.area();
        bb.envelop(&[[0.5, 0.5]]);
        assert_eq!(bb.area(), a1);
        bb.envelop(&[[3.0, -2.0]]);
        assert!(bb.area() > a1);
        assert_eq!(bb.min_y(), -2.0);
        assert_eq!(bb.max_x(), 3.0);

        // the combined box contains both input boxes
        let solo = BoundingBox::from_points(&[[3.0, -2.0]]);
        assert!(bb.min_x() <= solo.min_x() && bb.max_x() >= solo.max_x());
        assert!(bb.min_y() <= solo.min_y() && bb.max_y() >= solo.max_y());
    }

    #[test]
    fn test_translate() {
        let mut bb = BoundingBox::from_points(&[[1.0, 2.0], [3.0, 4.0]]);
        bb.translate(10.0, -1.0);
        assert_eq!(bb.min_x(), 11.0);
        assert_eq!(bb.max_x(), 13.0);
        assert_eq!(bb.min_y(), 1.0);
        assert_eq!(bb.max_y(), 3.0);

        let mut empty = BoundingBox::new();
        empty.translate(10.0, 10.0);
        assert!(!empty.valid());
    }

    #[test]
    fn test_rotate_identity_at_0_and_360() {
        for angle in [0.0, 360.0] {
            let mut bb = BoundingBox::from_points(&[[1.0, 2.0], [5.0, 7.0]]);
            let before = bb.corners().unwrap();
            bb.rotate(angle);
            let after = bb.corners().unwrap();
            for (b, a) in before.iter().zip(after.iter()) {
                assert_relative_eq!(b[0], a[0], epsilon = 1e-9);
                assert_relative_eq!(b[1], a[1], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_rotate_90() {
        let mut bb = BoundingBox::from_points(&[[0.0, 0.0], [4.0, 2.0]]);
        bb.rotate(90.0);
        assert_relative_eq!(bb.min_x(), -2.0, epsilon = 1e-9);
        assert_relative_eq!(bb.max_x(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(bb.min_y(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(bb.max_y(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotate_accumulates_loose_bound() {
        let mut bb = BoundingBox::from_points(&[[0.0, 0.0], [4.0, 2.0]]);
        let area = bb.area();
        bb.rotate(45.0);
        bb.rotate(-45.0);
        assert!(bb.area() > area);
    }

    #[test]
    fn test_center() {
        let bb = BoundingBox::from_points(&[[0.0, 0.0], [4.0, 2.0]]);
        assert_eq!(bb.center(), Some((2.0, 1.0)));
    }
}
