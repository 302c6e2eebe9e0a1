use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    application::{
        dto::DetectorSettings,
        ports::{DatasetRepoPort, DetectionStorePort, DetectorPort, ImageCodecPort, TrainerPort},
    },
    domain::{
        detection::{summarize_detections, Detection},
        errors::{DomainError, DomainResult},
        training::{DatasetDescriptor, TrainingPlan},
        upload::UploadOutcome,
    },
};

/// Upload use case: decode, detect, annotate, and record.
#[derive(Clone)]
pub struct UploadService {
    detector: Arc<dyn DetectorPort>,
    codec: Arc<dyn ImageCodecPort>,
    store: Arc<dyn DetectionStorePort>,
    settings: DetectorSettings,
}

impl UploadService {
    pub fn new(
        detector: Arc<dyn DetectorPort>,
        codec: Arc<dyn ImageCodecPort>,
        store: Arc<dyn DetectionStorePort>,
        settings: DetectorSettings,
    ) -> Self {
        Self { detector, codec, store, settings }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    pub fn class_count(&self) -> usize {
        self.detector.class_count()
    }

    pub async fn process(&self, bytes: Vec<u8>) -> DomainResult<UploadOutcome> {
        let request_id = Uuid::new_v4();
        debug!(%request_id, bytes = bytes.len(), "decoding upload");

        let codec = self.codec.clone();
        let image = tokio::task::spawn_blocking(move || codec.decode(&bytes))
            .await
            .map_err(|e| DomainError::from_join("decode", e))??;
        let (width, height) = image.dimensions();
        let image = Arc::new(image);

        let t_infer = Instant::now();
        let detections = self.detector.detect(image.clone(), &self.settings.params).await?;
        let infer_ms = t_infer.elapsed().as_secs_f32() * 1000.0;

        let codec = self.codec.clone();
        let drawn = detections.clone();
        let jpeg = tokio::task::spawn_blocking(move || codec.render_jpeg(&image, &drawn))
            .await
            .map_err(|e| DomainError::from_join("render", e))??;

        if self.settings.delivery.records() {
            self.store.record(request_id, detections.clone()).await?;
        }

        info!(
            %request_id,
            width,
            height,
            infer_ms,
            count = detections.len(),
            "detected: [{}]",
            summarize_detections(&detections)
        );

        Ok(UploadOutcome { request_id, jpeg, detections, width, height, infer_ms })
    }
}

/// Read side of the detection store.
#[derive(Clone)]
pub struct DetectionQueryService {
    store: Arc<dyn DetectionStorePort>,
}

impl DetectionQueryService {
    pub fn new(store: Arc<dyn DetectionStorePort>) -> Self {
        Self { store }
    }

    /// Latest-wins view; concurrent clients may observe each other's results.
    pub async fn latest(&self) -> DomainResult<Vec<Detection>> {
        self.store.latest().await
    }

    pub async fn by_request(&self, request_id: &Uuid) -> DomainResult<Vec<Detection>> {
        self.store
            .get(request_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("no detections for request {request_id}")))
    }
}

/// Training use case: validate the plan and dataset, then hand off.
#[derive(Clone)]
pub struct TrainingService {
    datasets: Arc<dyn DatasetRepoPort>,
    trainer: Arc<dyn TrainerPort>,
}

impl TrainingService {
    pub fn new(datasets: Arc<dyn DatasetRepoPort>, trainer: Arc<dyn TrainerPort>) -> Self {
        Self { datasets, trainer }
    }

    pub fn prepare(&self, plan: &TrainingPlan) -> DomainResult<DatasetDescriptor> {
        plan.validate()?;
        let descriptor = self.datasets.load(plan)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn command_line(&self, plan: &TrainingPlan) -> String {
        self.trainer.describe(plan)
    }

    pub fn run(&self, plan: &TrainingPlan) -> DomainResult<()> {
        let descriptor = self.prepare(plan)?;
        info!(
            classes = descriptor.names.len(),
            epochs = plan.epochs,
            imgsz = plan.imgsz,
            batch = plan.batch,
            "starting training: {}",
            self.trainer.describe(plan)
        );
        self.trainer.train(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        model::{ModelId, ModelProfile},
        training::ClassNames,
        upload::DeliveryMode,
    };
    use async_trait::async_trait;
    use image::RgbImage;
    use std::sync::Mutex;

    struct FixedDetector;

    #[async_trait]
    impl DetectorPort for FixedDetector {
        async fn detect(
            &self,
            _image: Arc<RgbImage>,
            _params: &crate::domain::model::YoloParams,
        ) -> DomainResult<Vec<Detection>> {
            Ok(vec![Detection {
                x1: 1.0,
                y1: 1.0,
                x2: 4.0,
                y2: 4.0,
                score: 0.8,
                class_id: 0,
                label: "bottle".into(),
            }])
        }

        fn class_count(&self) -> usize {
            1
        }
    }

    struct StubCodec;

    impl ImageCodecPort for StubCodec {
        fn decode(&self, bytes: &[u8]) -> DomainResult<RgbImage> {
            if bytes.is_empty() {
                return Err(DomainError::InvalidInput("empty".into()));
            }
            Ok(RgbImage::new(8, 6))
        }

        fn render_jpeg(&self, _image: &RgbImage, _detections: &[Detection]) -> DomainResult<Vec<u8>> {
            Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        records: Mutex<Vec<(Uuid, Vec<Detection>)>>,
    }

    #[async_trait]
    impl DetectionStorePort for RecordingStore {
        async fn record(&self, request_id: Uuid, detections: Vec<Detection>) -> DomainResult<()> {
            self.records.lock().unwrap().push((request_id, detections));
            Ok(())
        }

        async fn latest(&self) -> DomainResult<Vec<Detection>> {
            Ok(self.records.lock().unwrap().last().map(|r| r.1.clone()).unwrap_or_default())
        }

        async fn get(&self, request_id: &Uuid) -> DomainResult<Option<Vec<Detection>>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| &r.0 == request_id)
                .map(|r| r.1.clone()))
        }
    }

    fn service(delivery: DeliveryMode, store: Arc<RecordingStore>) -> UploadService {
        UploadService::new(
            Arc::new(FixedDetector),
            Arc::new(StubCodec),
            store,
            DetectorSettings {
                model: ModelId::from_path("models/test.onnx"),
                params: ModelProfile::V8.params(),
                delivery,
            },
        )
    }

    #[tokio::test]
    async fn process_records_when_delivery_uses_the_store() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(DeliveryMode::Both, store.clone());
        let out = svc.process(vec![1, 2, 3]).await.unwrap();
        assert_eq!((out.width, out.height), (8, 6));
        assert_eq!(out.detections.len(), 1);
        assert!(!out.jpeg.is_empty());
        assert_eq!(store.records.lock().unwrap()[0].0, out.request_id);
    }

    #[tokio::test]
    async fn header_only_delivery_skips_the_store() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(DeliveryMode::Header, store.clone());
        svc.process(vec![1]).await.unwrap();
        assert!(store.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn decode_errors_are_propagated() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(DeliveryMode::Both, store);
        let err = svc.process(Vec::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let query = DetectionQueryService::new(Arc::new(RecordingStore::default()));
        assert!(query.latest().await.unwrap().is_empty());
        let err = query.by_request(&Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    struct StaticDatasets(DatasetDescriptor);

    impl DatasetRepoPort for StaticDatasets {
        fn load(&self, _plan: &TrainingPlan) -> DomainResult<DatasetDescriptor> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct CountingTrainer {
        runs: Mutex<u32>,
    }

    impl TrainerPort for CountingTrainer {
        fn describe(&self, plan: &TrainingPlan) -> String {
            format!("train {}", plan.model)
        }

        fn train(&self, _plan: &TrainingPlan) -> DomainResult<()> {
            *self.runs.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn descriptor() -> DatasetDescriptor {
        DatasetDescriptor {
            path: None,
            train: Some("train/images".into()),
            val: Some("valid/images".into()),
            test: None,
            nc: Some(1),
            names: ClassNames::List(vec!["debris".into()]),
        }
    }

    #[test]
    fn training_runs_only_valid_plans() {
        let trainer = Arc::new(CountingTrainer::default());
        let svc = TrainingService::new(Arc::new(StaticDatasets(descriptor())), trainer.clone());

        let mut bad = TrainingPlan::new("data.yaml");
        bad.batch = 0;
        assert!(svc.run(&bad).is_err());
        assert_eq!(*trainer.runs.lock().unwrap(), 0);

        svc.run(&TrainingPlan::new("data.yaml")).unwrap();
        assert_eq!(*trainer.runs.lock().unwrap(), 1);
    }

    #[test]
    fn training_rejects_inconsistent_descriptor() {
        let mut desc = descriptor();
        desc.val = None;
        let svc = TrainingService::new(Arc::new(StaticDatasets(desc)), Arc::new(CountingTrainer::default()));
        assert!(svc.prepare(&TrainingPlan::new("data.yaml")).is_err());
    }
}
