//! Planar positions.

use serde::{Deserialize, Serialize};

/// A 2D point or offset in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Vec2 {
    /// The origin.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Construct a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    ///
    /// Every proximity test in the kernel goes through this function so that
    /// trigger evaluation and the spatial pre-filter agree bit for bit.
    #[inline]
    pub fn distance(self, other: Vec2) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Move from `self` toward `target` by at most `step`, never overshooting.
    pub fn step_toward(self, target: Vec2, step: f64) -> Vec2 {
        let d = self.distance(target);
        if d <= step || d == 0.0 {
            return target;
        }
        let t = step / d;
        Vec2::new(self.x + (target.x - self.x) * t, self.y + (target.y - self.y) * t)
    }

    /// Whether both coordinates are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(Vec2::new(0.0, 0.0).distance(Vec2::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn step_toward_stops_at_target() {
        let from = Vec2::new(0.0, 0.0);
        let to = Vec2::new(10.0, 0.0);
        assert_eq!(from.step_toward(to, 4.0), Vec2::new(4.0, 0.0));
        assert_eq!(from.step_toward(to, 40.0), to);
    }
}
