use anyhow::Context;
use clap::Parser;
use std::sync::Arc;

use debris_detect::adapters::{
    http::{router, state::HttpState},
    imaging::{annotate::Annotator, codec::ImageCrateCodec},
    onnx::{model_catalog::OnnxModelCatalog, yolo_engine::{OnnxDetector, OnnxYoloEngine}},
    store::memory::InMemoryDetectionStore,
};
use debris_detect::application::ports::ModelCatalogPort;
use debris_detect::application::services::{DetectionQueryService, UploadService};
use debris_detect::config::ServeArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logs (RUST_LOG=info by default)
    debris_detect::init_tracing();

    // 2. Config: profile, then flags / env
    let cfg = ServeArgs::parse().resolve()?;
    tracing::info!(
        "profile model {} conf={} imgsz={} delivery={}",
        cfg.detector.model.onnx_path,
        cfg.detector.params.conf_threshold,
        cfg.detector.params.input_size,
        cfg.detector.delivery
    );

    // 3. Adapters. The model is loaded once and shared across requests.
    OnnxModelCatalog::new().validate_model(&cfg.detector.model).await?;
    let model_path = cfg.detector.model.onnx_path.clone();
    let labels = cfg.labels.clone();
    let engine = tokio::task::spawn_blocking(move || OnnxYoloEngine::load(&model_path, labels.as_deref()))
        .await
        .context("model loader panicked")??;
    let detector = Arc::new(OnnxDetector::new(engine));

    let annotator = match &cfg.font {
        Some(path) => Annotator::with_font_path(path)?,
        None => Annotator::with_system_font(),
    };
    if !annotator.has_font() {
        tracing::warn!("no label font available; annotated images will show boxes only");
    }
    let codec = Arc::new(ImageCrateCodec::new(annotator));
    let store = Arc::new(InMemoryDetectionStore::new(cfg.store_ttl, cfg.store_capacity));

    // 4. Services
    let upload = Arc::new(UploadService::new(detector, codec, store.clone(), cfg.detector.clone()));
    let detections = Arc::new(DetectionQueryService::new(store));
    let state = HttpState { upload, detections };

    // 5. Router and server
    let app = router(state, &cfg.router);
    if let Some(dir) = &cfg.router.static_dir {
        tracing::info!("serving static files from {}", dir.display());
    }

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    tracing::info!("detection service listening on http://{}", cfg.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
