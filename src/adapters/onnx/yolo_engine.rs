use anyhow::{Context, Result};
use async_trait::async_trait;
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array4, ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use super::labels::ClassLabels;
use super::postprocess::decode_predictions;
use crate::application::ports::DetectorPort;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::YoloParams;

pub struct OnnxYoloEngine {
    session: Session,
    labels: ClassLabels,
}

impl OnnxYoloEngine {
    /// Loads the model; `labels_path` overrides the names embedded in the export.
    pub fn load(path: &str, labels_path: Option<&Path>) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA is optional: register it when available, otherwise stay on CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path).with_context(|| format!("reading model {path}"))?;
        let session = builder.commit_from_memory(&model_bytes)?;

        let labels = match labels_path {
            Some(p) => ClassLabels::from_file(p)?,
            None => embedded_labels(&session).unwrap_or_else(|| {
                warn!("model {path} has no embedded class names, falling back to COCO");
                ClassLabels::coco()
            }),
        };
        info!("loaded detector {} ({} classes)", path, labels.len());

        Ok(Self { session, labels })
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    pub fn infer(&mut self, rgb: &RgbImage, params: &YoloParams) -> Result<Vec<Detection>> {
        let imgsz = params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Triangle);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let (raw, _) = input.into_raw_vec_and_offset();
        let input_tensor = Value::from_array((input_shape, raw))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        anyhow::ensure!(dims.len() == 3, "unexpected detector output rank {:?}", dims);
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;

        Ok(decode_predictions(view, rgb.width(), rgb.height(), params, &self.labels))
    }
}

fn embedded_labels(session: &Session) -> Option<ClassLabels> {
    let metadata = session.metadata().ok()?;
    let raw = metadata.custom("names").ok().flatten()?;
    ClassLabels::from_metadata(&raw)
}

/// `DetectorPort` over a shared engine. Inference is serialized by the mutex
/// and runs off the async runtime.
#[derive(Clone)]
pub struct OnnxDetector {
    engine: Arc<Mutex<OnnxYoloEngine>>,
    class_count: usize,
}

impl OnnxDetector {
    pub fn new(engine: OnnxYoloEngine) -> Self {
        let class_count = engine.labels().len();
        Self { engine: Arc::new(Mutex::new(engine)), class_count }
    }
}

#[async_trait]
impl DetectorPort for OnnxDetector {
    async fn detect(&self, image: Arc<RgbImage>, params: &YoloParams) -> DomainResult<Vec<Detection>> {
        let engine = self.engine.clone();
        let params = params.clone();
        tokio::task::spawn_blocking(move || {
            let mut engine = engine
                .lock()
                .map_err(|_| DomainError::OperationFailed("detector lock poisoned".into()))?;
            engine
                .infer(&image, &params)
                .map_err(|e| DomainError::OperationFailed(format!("inference failed: {e:#}")))
        })
        .await
        .map_err(|e| DomainError::from_join("inference", e))?
    }

    fn class_count(&self) -> usize {
        self.class_count
    }
}
