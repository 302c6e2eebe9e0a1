use serde::{Deserialize, Serialize};

use crate::domain::{
    detection::Detection,
    model::{ModelId, YoloParams},
    upload::DeliveryMode,
};

/// Wire shape of one detection: `{ "class": ..., "confidence": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionDto {
    #[serde(rename = "class")]
    pub class: String,
    pub confidence: f32,
}

impl From<&Detection> for DetectionDto {
    fn from(d: &Detection) -> Self {
        Self { class: d.label.clone(), confidence: d.confidence() }
    }
}

pub fn to_dtos(detections: &[Detection]) -> Vec<DetectionDto> {
    detections.iter().map(DetectionDto::from).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub model: ModelId,
    pub params: YoloParams,
    pub delivery: DeliveryMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model: String,
    pub classes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dto_serializes_class_key() {
        let det = Detection {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
            score: 0.75,
            class_id: 3,
            label: "bottle".into(),
        };
        let json = serde_json::to_value(to_dtos(&[det])).unwrap();
        assert_eq!(json, serde_json::json!([{ "class": "bottle", "confidence": 0.75 }]));
    }
}
