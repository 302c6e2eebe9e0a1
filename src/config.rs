//! Command-line / environment configuration for the upload service.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::http::{RouterOptions, DEFAULT_MAX_UPLOAD_BYTES};
use crate::application::dto::DetectorSettings;
use crate::domain::model::{ModelId, ModelProfile, YoloParams};
use crate::domain::upload::DeliveryMode;

#[derive(Debug, Clone, Parser)]
#[command(name = "debris-detect", version, about = "Object-detection upload service (YOLO / ONNX Runtime)")]
pub struct ServeArgs {
    /// Listen address.
    #[arg(long, env = "DETECT_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Detector preset (v8: yolov8m @ 0.05, v12: yolo12n @ 0.5).
    #[arg(long, env = "DETECT_PROFILE", default_value = "v8")]
    pub profile: ModelProfile,

    /// ONNX model path; defaults to the profile's model.
    #[arg(long, env = "DETECT_MODEL")]
    pub model: Option<PathBuf>,

    /// Confidence threshold override.
    #[arg(long, env = "DETECT_CONF")]
    pub conf: Option<f32>,

    /// Square input size override.
    #[arg(long, env = "DETECT_IMGSZ")]
    pub imgsz: Option<u32>,

    /// NMS IoU threshold override.
    #[arg(long, env = "DETECT_IOU")]
    pub iou: Option<f32>,

    #[arg(long, env = "DETECT_MAX_DET")]
    pub max_det: Option<usize>,

    /// Detection delivery: header, query, or both.
    #[arg(long, env = "DETECT_DELIVERY", default_value = "both")]
    pub delivery: DeliveryMode,

    /// Class names file (one per line), overrides names embedded in the model.
    #[arg(long, env = "DETECT_LABELS")]
    pub labels: Option<PathBuf>,

    /// TTF/OTF font for box labels; a system font is tried otherwise.
    #[arg(long, env = "DETECT_FONT")]
    pub font: Option<PathBuf>,

    /// Directory served for unmatched paths (frontend build).
    #[arg(long, env = "DETECT_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    #[arg(long, env = "DETECT_STORE_TTL_SECS", default_value_t = 300)]
    pub store_ttl_secs: u64,

    #[arg(long, env = "DETECT_STORE_CAPACITY", default_value_t = 256)]
    pub store_capacity: usize,

    #[arg(long, env = "DETECT_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

/// Validated, fully resolved configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: SocketAddr,
    pub detector: DetectorSettings,
    pub labels: Option<PathBuf>,
    pub font: Option<PathBuf>,
    pub store_ttl: Duration,
    pub store_capacity: usize,
    pub router: RouterOptions,
}

impl ServeArgs {
    /// Profile values first, explicit flags on top.
    pub fn resolve(&self) -> Result<ServiceConfig> {
        let base = self.profile.params();
        let params = YoloParams {
            input_size: self.imgsz.unwrap_or(base.input_size),
            conf_threshold: self.conf.unwrap_or(base.conf_threshold),
            iou_threshold: self.iou.unwrap_or(base.iou_threshold),
            max_detections: self.max_det.unwrap_or(base.max_detections),
        };
        params.validate().context("invalid detector parameters")?;

        let model_path = match &self.model {
            Some(p) => p.to_string_lossy().to_string(),
            None => self.profile.default_model_path().to_string(),
        };

        anyhow::ensure!(self.store_capacity > 0, "store capacity must be > 0");
        anyhow::ensure!(self.max_upload_bytes > 0, "max upload size must be > 0");

        Ok(ServiceConfig {
            bind: self.bind,
            detector: DetectorSettings {
                model: ModelId::from_path(&model_path),
                params,
                delivery: self.delivery,
            },
            labels: self.labels.clone(),
            font: self.font.clone(),
            store_ttl: Duration::from_secs(self.store_ttl_secs),
            store_capacity: self.store_capacity,
            router: RouterOptions {
                max_upload_bytes: self.max_upload_bytes,
                static_dir: self.static_dir.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_v8_profile() {
        let cfg = ServeArgs::try_parse_from(["debris-detect"]).unwrap().resolve().unwrap();
        assert_eq!(cfg.bind.port(), 8000);
        assert_eq!(cfg.detector.model.onnx_path, "models/yolov8m.onnx");
        assert_eq!(cfg.detector.params.conf_threshold, 0.05);
        assert_eq!(cfg.detector.delivery, DeliveryMode::Both);
        assert_eq!(cfg.router.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn explicit_flags_override_profile() {
        let cfg = ServeArgs::try_parse_from([
            "debris-detect",
            "--profile",
            "v12",
            "--conf",
            "0.3",
            "--model",
            "best.onnx",
            "--delivery",
            "header",
        ])
        .unwrap()
        .resolve()
        .unwrap();
        assert_eq!(cfg.detector.params.conf_threshold, 0.3);
        assert_eq!(cfg.detector.params.input_size, 640);
        assert_eq!(cfg.detector.model.name, "best");
        assert_eq!(cfg.detector.delivery, DeliveryMode::Header);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(ServeArgs::try_parse_from(["debris-detect", "--profile", "v5"]).is_err());
        let args = ServeArgs::try_parse_from(["debris-detect", "--conf", "2.0"]).unwrap();
        assert!(args.resolve().is_err());
        let args = ServeArgs::try_parse_from(["debris-detect", "--imgsz", "500"]).unwrap();
        assert!(args.resolve().is_err());
    }
}
