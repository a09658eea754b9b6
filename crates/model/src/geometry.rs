use serde::{Deserialize, Serialize};

/// An axis-aligned box on the page, in the coordinate space of the source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }

    /// True if the two boxes share any area or touch on an edge.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.x1.min(self.x2) <= other.x1.max(other.x2)
            && other.x1.min(other.x2) <= self.x1.max(self.x2)
            && self.y1.min(self.y2) <= other.y1.max(other.y2)
            && other.y1.min(other.y2) <= self.y1.max(self.y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_ignore_corner_order() {
        let bbox = BoundingBox::new(10.0, 40.0, 4.0, 20.0);
        assert_eq!(bbox.width(), 6.0);
        assert_eq!(bbox.height(), 20.0);
    }

    #[test]
    fn test_overlaps() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 5.0, 20.0, 15.0);
        let c = BoundingBox::new(11.0, 11.0, 12.0, 12.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
