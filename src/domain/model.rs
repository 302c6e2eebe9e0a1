use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,       // logical name, e.g. "yolov8m"
    pub onnx_path: String,  // filesystem path
}

impl ModelId {
    /// Derives the logical name from the file stem.
    pub fn from_path(path: &str) -> Self {
        let name = std::path::Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "model".to_string());
        Self { name, onnx_path: path.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // square side, multiple of 32
    pub conf_threshold: f32,    // 0..1
    pub iou_threshold: f32,     // 0..1
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        ModelProfile::V8.params()
    }
}

impl YoloParams {
    pub fn validate(&self) -> DomainResult<()> {
        if self.input_size == 0 || self.input_size % 32 != 0 {
            return Err(DomainError::InvalidInput(format!(
                "input size must be a positive multiple of 32, got {}",
                self.input_size
            )));
        }
        if !(0.0..=1.0).contains(&self.conf_threshold) {
            return Err(DomainError::InvalidInput(format!(
                "confidence threshold must be within [0, 1], got {}",
                self.conf_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(DomainError::InvalidInput(format!(
                "IoU threshold must be within [0, 1], got {}",
                self.iou_threshold
            )));
        }
        if self.max_detections == 0 {
            return Err(DomainError::InvalidInput("max detections must be > 0".into()));
        }
        Ok(())
    }
}

/// Presets for the two detector snapshots the service has shipped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProfile {
    /// yolov8m, permissive threshold (0.05).
    V8,
    /// yolo12n, strict threshold (0.5).
    V12,
}

impl ModelProfile {
    pub fn default_model_path(self) -> &'static str {
        match self {
            ModelProfile::V8 => "models/yolov8m.onnx",
            ModelProfile::V12 => "models/yolo12n.onnx",
        }
    }

    pub fn params(self) -> YoloParams {
        let conf_threshold = match self {
            ModelProfile::V8 => 0.05,
            ModelProfile::V12 => 0.5,
        };
        YoloParams {
            input_size: 640,
            conf_threshold,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

impl fmt::Display for ModelProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelProfile::V8 => f.write_str("v8"),
            ModelProfile::V12 => f.write_str("v12"),
        }
    }
}

impl FromStr for ModelProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v8" | "yolov8" => Ok(ModelProfile::V8),
            "v12" | "yolo12" | "yolov12" => Ok(ModelProfile::V12),
            other => Err(format!("unknown model profile `{other}` (expected v8 or v12)")),
        }
    }
}
