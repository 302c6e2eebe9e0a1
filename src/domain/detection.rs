use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One predicted object, in source-image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: usize,
    pub label: String,
}

impl Detection {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Confidence clamped to [0, 1]; raw head outputs can drift slightly outside.
    pub fn confidence(&self) -> f32 {
        if self.score.is_nan() {
            0.0
        } else {
            self.score.clamp(0.0, 1.0)
        }
    }
}

/// Intersection over union of two axis-aligned boxes.
pub fn iou(a: &Detection, b: &Detection) -> f32 {
    let x0 = a.x1.max(b.x1);
    let y0 = a.y1.max(b.y1);
    let x1 = a.x2.min(b.x2);
    let y1 = a.y2.min(b.y2);
    let inter = (x1 - x0).max(0.0) * (y1 - y0).max(0.0);
    let union = a.area() + b.area() - inter + 1e-6;
    inter / union
}

/// "2 bottle, 1 plastic bag" style summary, ordered by label.
pub fn summarize_detections(detections: &[Detection]) -> String {
    let mut counts = BTreeMap::new();
    for det in detections {
        *counts.entry(det.label.as_str()).or_insert(0usize) += 1;
    }
    counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, label: &str) -> Detection {
        Detection { x1, y1, x2, y2, score: 0.9, class_id: 0, label: label.into() }
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = det(0.0, 0.0, 10.0, 10.0, "a");
        assert!((iou(&a, &a) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = det(0.0, 0.0, 10.0, 10.0, "a");
        let b = det(20.0, 20.0, 30.0, 30.0, "b");
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn confidence_is_clamped() {
        let mut d = det(0.0, 0.0, 1.0, 1.0, "a");
        d.score = 1.2;
        assert_eq!(d.confidence(), 1.0);
        d.score = f32::NAN;
        assert_eq!(d.confidence(), 0.0);
    }

    #[test]
    fn summary_counts_labels() {
        let dets = vec![
            det(0.0, 0.0, 1.0, 1.0, "bottle"),
            det(0.0, 0.0, 1.0, 1.0, "net"),
            det(0.0, 0.0, 1.0, 1.0, "bottle"),
        ];
        assert_eq!(summarize_detections(&dets), "2 bottle, 1 net");
        assert_eq!(summarize_detections(&[]), "");
    }
}
