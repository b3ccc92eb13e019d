// Math utilities shared across the engine

use glam::Vec2;

/// Axis-aligned rectangle in scene coordinates.
///
/// Used both for hitbox overlap tests and for the invalidated regions
/// returned by a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Top-left corner
    pub min: Vec2,
    /// Bottom-right corner
    pub max: Vec2,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            min: position,
            max: position + size,
        }
    }

    /// Create a rectangle directly from its corners
    pub fn from_corners(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Width and height as a vector
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Strict overlap test: touching edges do not count as an overlap
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    /// Whether `other` lies fully inside this rectangle (edges inclusive)
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    /// Smallest rectangle covering both `self` and `other`
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}
