// SPDX-License-Identifier: MIT OR Apache-2.0
//! Axis-aligned rectangles in rig coordinates (y down).

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a rect from origin and size
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Create a rect from a top-left point and a size
    pub fn from_origin_size(origin: DVec2, size: DVec2) -> Self {
        Self::new(origin.x, origin.y, size.x, size.y)
    }

    /// Create a rect spanning two corners
    pub fn from_min_max(min: DVec2, max: DVec2) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Top-left corner
    pub fn min(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Bottom-right corner
    pub fn max(&self) -> DVec2 {
        DVec2::new(self.max_x(), self.max_y())
    }

    /// Right edge
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Size as a vector
    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    /// Center point
    pub fn center(&self) -> DVec2 {
        DVec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Width over height (infinite for a zero-height rect)
    pub fn aspect(&self) -> f64 {
        if self.height == 0.0 {
            f64::INFINITY
        } else {
            self.width / self.height
        }
    }

    /// Smallest rect containing both rects
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_min_max(self.min().min(other.min()), self.max().max(other.max()))
    }

    /// Whether the point lies inside (edges inclusive)
    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= self.x && point.x <= self.max_x() && point.y >= self.y && point.y <= self.max_y()
    }

    /// Whether both rects match within `eps` on every edge
    pub fn approx_eq(&self, other: &Rect, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.max_x() - other.max_x()).abs() <= eps
            && (self.max_y() - other.max_y()).abs() <= eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_and_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 5.0);
        let b = Rect::new(5.0, -5.0, 10.0, 5.0);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(0.0, -5.0, 15.0, 10.0));
        assert_eq!(u.max_x(), 15.0);
        assert!(u.contains(DVec2::new(15.0, 5.0)));
        assert!(!u.contains(DVec2::new(15.1, 5.0)));
    }

    #[test]
    fn test_aspect() {
        assert_eq!(Rect::new(0.0, 0.0, 30.0, 10.0).aspect(), 3.0);
        assert!(Rect::new(0.0, 0.0, 1.0, 0.0).aspect().is_infinite());
    }
}
