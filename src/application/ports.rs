use async_trait::async_trait;
use image::RgbImage;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    detection::Detection,
    errors::DomainResult,
    model::{ModelId, YoloParams},
    training::{DatasetDescriptor, TrainingPlan},
};

/// Runs the detection model on a decoded image.
#[async_trait]
pub trait DetectorPort: Send + Sync {
    async fn detect(&self, image: Arc<RgbImage>, params: &YoloParams) -> DomainResult<Vec<Detection>>;
    /// Number of class labels the detector knows about.
    fn class_count(&self) -> usize;
}

/// Decodes uploads and renders the annotated JPEG. Both are CPU-bound and
/// are called from blocking threads.
pub trait ImageCodecPort: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> DomainResult<RgbImage>;
    fn render_jpeg(&self, image: &RgbImage, detections: &[Detection]) -> DomainResult<Vec<u8>>;
}

/// Keyed, expiring storage for per-request detections.
#[async_trait]
pub trait DetectionStorePort: Send + Sync {
    async fn record(&self, request_id: Uuid, detections: Vec<Detection>) -> DomainResult<()>;
    /// Detections of the most recent live record, or empty.
    async fn latest(&self) -> DomainResult<Vec<Detection>>;
    async fn get(&self, request_id: &Uuid) -> DomainResult<Option<Vec<Detection>>>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}

pub trait DatasetRepoPort: Send + Sync {
    fn load(&self, plan: &TrainingPlan) -> DomainResult<DatasetDescriptor>;
}

/// Delegates the optimization loop to an external trainer.
pub trait TrainerPort: Send + Sync {
    fn describe(&self, plan: &TrainingPlan) -> String;
    fn train(&self, plan: &TrainingPlan) -> DomainResult<()>;
}
