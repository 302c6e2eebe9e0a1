use ndarray::{ArrayView2, Axis};

use super::labels::ClassLabels;
use crate::domain::detection::{iou, Detection};
use crate::domain::model::YoloParams;

/// Decodes a YOLOv8-style head (`[4 + nc, N]`, or its transpose) into
/// detections in source-image coordinates, then applies NMS.
pub fn decode_predictions(
    output: ArrayView2<f32>,
    src_width: u32,
    src_height: u32,
    params: &YoloParams,
    labels: &ClassLabels,
) -> Vec<Detection> {
    // Anchors always outnumber channels; transpose `[N, 4 + nc]` layouts.
    let view = if output.shape()[0] > output.shape()[1] { output.reversed_axes() } else { output };
    let channels = view.shape()[0];
    if channels <= 4 {
        return Vec::new();
    }

    let imgsz = params.input_size as f32;
    let sx = src_width as f32 / imgsz;
    let sy = src_height as f32 / imgsz;
    let max_x = src_width as f32;
    let max_y = src_height as f32;

    let mut candidates = Vec::new();
    for (i, column) in view.axis_iter(Axis(1)).enumerate() {
        let Some((class_id, &score)) = column
            .iter()
            .skip(4)
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };
        if score.is_nan() || score < params.conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (view[[0, i]], view[[1, i]], view[[2, i]], view[[3, i]]);
        candidates.push(Detection {
            x1: ((cx - w / 2.0) * sx).clamp(0.0, max_x),
            y1: ((cy - h / 2.0) * sy).clamp(0.0, max_y),
            x2: ((cx + w / 2.0) * sx).clamp(0.0, max_x),
            y2: ((cy + h / 2.0) * sy).clamp(0.0, max_y),
            score,
            class_id,
            label: labels.get(class_id).to_string(),
        });
    }

    let mut kept = non_max_suppression(candidates, params.iou_threshold);
    kept.truncate(params.max_detections);
    kept
}

/// Class-aware NMS. Output is sorted by descending score.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == det.class_id && iou(k, &det) > iou_threshold);
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}
