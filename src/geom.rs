use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in PDF points.
///
/// Coordinates are top-down (origin at the top-left of the page, y grows
/// toward the bottom), matching the order the reader emits words in. The
/// writer flips back to PDF bottom-up coordinates when drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// One whitespace-delimited word on a page, in reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordToken {
    pub bbox: Rect,
    pub text: String,
    pub page: usize,
}

impl WordToken {
    pub fn new(bbox: Rect, text: impl Into<String>, page: usize) -> Self {
        Self {
            bbox,
            text: text.into(),
            page,
        }
    }
}
