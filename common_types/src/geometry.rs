use serde::{Deserialize, Serialize};

/// A viewport-relative rectangle. Used throughout the sandbox validator: scene graph
/// nodes, input candidates and the three-scale visual delta comparison all share this
/// shape so geometry math is written once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// True if any part of the box overlaps the `w`×`h` viewport. A box entirely past
    /// the right or bottom edge, or with a negative origin past the box extent, is out.
    pub fn in_viewport(&self, w: f64, h: f64) -> bool {
        self.x < w && self.y < h && self.x + self.width > 0.0 && self.y + self.height > 0.0
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Expand the box by `padding` on every side. Used to build the tight/normal
    /// regions for Phase 5's three-scale visual delta comparison.
    pub fn expand(&self, padding: f64) -> Self {
        Self {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + padding * 2.0,
            height: self.height + padding * 2.0,
        }
    }

    /// Euclidean distance between this box's position/size and `other`'s, used by
    /// the scene-graph delta fallback to detect a shift greater than 10px.
    pub fn position_shift(&self, other: &BoundingBox) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn size_shift(&self, other: &BoundingBox) -> f64 {
        ((self.width - other.width).powi(2) + (self.height - other.height).powi(2)).sqrt()
    }
}
