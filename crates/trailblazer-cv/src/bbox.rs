//! Candidate boxes and non-maximum suppression
//!
//! The enhanced template search collects several candidate placements per
//! scale; suppression collapses overlapping ones so that "best" and
//! "runner-up" always refer to two different places in the image.

use serde::{Deserialize, Serialize};

/// A scored template placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f64,
    /// Template scale that produced this placement
    pub scale: f64,
}

impl BBox {
    /// Create a new bounding box
    pub fn new(x: i32, y: i32, width: i32, height: i32, confidence: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Calculate area of the bounding box
    pub fn area(&self) -> f64 {
        (self.width as f64) * (self.height as f64)
    }

    /// Calculate intersection over union (IoU) with another box
    pub fn iou(&self, other: &BBox) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = ((x2 - x1) as f64) * ((y2 - y1) as f64);
        let union = self.area() + other.area() - intersection;

        intersection / union
    }
}

/// Collection of bounding boxes with batch operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BBoxCollection {
    boxes: Vec<BBox>,
}

impl BBoxCollection {
    /// Create new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from vector of boxes
    pub fn from_vec(boxes: Vec<BBox>) -> Self {
        Self { boxes }
    }

    /// Add a box to the collection
    pub fn push(&mut self, bbox: BBox) {
        self.boxes.push(bbox);
    }

    /// Sort by confidence (descending); NaN scores sink to the end
    pub fn sort_by_confidence(&mut self) {
        self.boxes.sort_by(|a, b| {
            let a = if a.confidence.is_nan() { f64::NEG_INFINITY } else { a.confidence };
            let b = if b.confidence.is_nan() { f64::NEG_INFINITY } else { b.confidence };
            b.total_cmp(&a)
        });
    }

    /// Apply non-maximum suppression
    pub fn apply_nms(mut self, threshold: f64) -> Self {
        if self.boxes.is_empty() {
            return self;
        }

        // Sort by confidence
        self.sort_by_confidence();

        let mut keep = Vec::new();
        let mut suppressed = vec![false; self.boxes.len()];

        for i in 0..self.boxes.len() {
            if suppressed[i] {
                continue;
            }

            keep.push(self.boxes[i].clone());

            // Suppress overlapping boxes
            for j in (i + 1)..self.boxes.len() {
                if !suppressed[j] && self.boxes[i].iou(&self.boxes[j]) > threshold {
                    suppressed[j] = true;
                }
            }
        }

        Self::from_vec(keep)
    }

    /// Best box and the best box that does not overlap it
    pub fn best_and_runner_up(self, threshold: f64) -> (Option<BBox>, Option<BBox>) {
        let mut distinct = self.apply_nms(threshold).boxes.into_iter();
        (distinct.next(), distinct.next())
    }
}

impl FromIterator<BBox> for BBoxCollection {
    fn from_iter<T: IntoIterator<Item = BBox>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_iou() {
        let box1 = BBox::new(0, 0, 10, 10, 0.9);
        let box2 = BBox::new(5, 5, 10, 10, 0.8);

        let iou = box1.iou(&box2);
        assert!(iou > 0.0 && iou < 1.0);
        assert_eq!(box1.iou(&BBox::new(50, 50, 10, 10, 0.1)), 0.0);
    }

    #[test]
    fn test_nms() {
        let mut collection = BBoxCollection::new();
        collection.push(BBox::new(0, 0, 10, 10, 0.9));
        collection.push(BBox::new(2, 2, 10, 10, 0.8));
        collection.push(BBox::new(20, 20, 10, 10, 0.7));

        let result = collection.apply_nms(0.5);
        assert_eq!(result.boxes.len(), 2); // Keeps the strongest of the overlapping pair and the distant box
    }

    #[test]
    fn test_runner_up_is_distinct() {
        let boxes: BBoxCollection = vec![
            BBox::new(0, 0, 10, 10, 0.95),
            BBox::new(1, 1, 10, 10, 0.94),
            BBox::new(40, 40, 10, 10, 0.60),
        ]
        .into_iter()
        .collect();

        let (best, second) = boxes.best_and_runner_up(0.3);
        assert_eq!(best.unwrap().confidence, 0.95);
        assert_eq!(second.unwrap().confidence, 0.60);
    }
}
