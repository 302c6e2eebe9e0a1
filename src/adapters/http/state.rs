use std::sync::Arc;
use crate::application::services::{DetectionQueryService, UploadService};

/// Shared state for the axum handlers: the use-case services.
#[derive(Clone)]
pub struct HttpState {
    /// Decode → detect → annotate pipeline for `POST /upload`.
    pub upload: Arc<UploadService>,
    /// Read side for `GET /detections`.
    pub detections: Arc<DetectionQueryService>,
}
