use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::adapters::http::{error::ApiError, state::HttpState};
use crate::application::dto::{to_dtos, DetectionDto, HealthResponse};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::upload::UploadOutcome;

pub const UPLOAD_FIELD: &str = "file";

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub static X_DETECTIONS: HeaderName = HeaderName::from_static("x-detections");
pub static X_DETECTION_COUNT: HeaderName = HeaderName::from_static("x-detection-count");
pub static X_INFERENCE_MS: HeaderName = HeaderName::from_static("x-inference-ms");

/// Headers browsers may read cross-origin.
pub fn exposed_headers() -> [HeaderName; 4] {
    [
        X_REQUEST_ID.clone(),
        X_DETECTIONS.clone(),
        X_DETECTION_COUNT.clone(),
        X_INFERENCE_MS.clone(),
    ]
}

pub async fn upload(
    State(st): State<HttpState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        let message = format!("expected a multipart/form-data upload: {}", rejection.body_text());
        classify_upload_error(rejection.status(), message)
    })?;
    let bytes = read_upload(&mut multipart).await?;
    let outcome = st.upload.process(bytes).await?;
    Ok(upload_response(outcome, st.upload.settings().delivery.in_header()))
}

pub async fn latest_detections(State(st): State<HttpState>) -> Result<Json<Vec<DetectionDto>>, ApiError> {
    let detections = st.detections.latest().await?;
    Ok(Json(to_dtos(&detections)))
}

pub async fn detections_by_request(
    State(st): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DetectionDto>>, ApiError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| DomainError::InvalidInput(format!("`{id}` is not a valid request id")))?;
    let detections = st.detections.by_request(&id).await?;
    Ok(Json(to_dtos(&detections)))
}

pub async fn health(State(st): State<HttpState>) -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        model: st.upload.settings().model.name.clone(),
        classes: st.upload.class_count(),
    })
}

pub async fn get_config(State(st): State<HttpState>) -> impl IntoResponse {
    let s = st.upload.settings();
    Json(json!({
        "model_name": s.model.name,
        "model_path": s.model.onnx_path,
        "imgsz": s.params.input_size,
        "conf_thres": s.params.conf_threshold,
        "iou_thres": s.params.iou_threshold,
        "max_det": s.params.max_detections,
        "delivery": s.delivery.to_string(),
    }))
}

/// Takes the `file` field, or failing that the first field carrying a filename.
async fn read_upload(multipart: &mut Multipart) -> DomainResult<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("malformed multipart body", e))?
    {
        if field.name() != Some(UPLOAD_FIELD) && field.file_name().is_none() {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("failed to read upload", e))?;
        return Ok(data.to_vec());
    }
    Err(DomainError::InvalidInput(format!("missing multipart field `{UPLOAD_FIELD}`")))
}

/// Body-limit hits become `TooLarge` (413); anything else is a bad request.
fn classify_upload_error(status: StatusCode, message: String) -> DomainError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        DomainError::TooLarge("upload exceeds the size limit".into())
    } else {
        DomainError::InvalidInput(message)
    }
}

fn multipart_error(context: &str, err: MultipartError) -> DomainError {
    classify_upload_error(err.status(), format!("{context}: {}", err.body_text()))
}

fn upload_response(mut outcome: UploadOutcome, with_detections: bool) -> Response {
    let jpeg = std::mem::take(&mut outcome.jpeg);
    let mut response = ([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response();
    let headers = response.headers_mut();

    if let Ok(v) = HeaderValue::from_str(&outcome.request_id.to_string()) {
        headers.insert(X_REQUEST_ID.clone(), v);
    }
    headers.insert(X_DETECTION_COUNT.clone(), HeaderValue::from(outcome.detections.len()));
    if let Ok(v) = HeaderValue::from_str(&format!("{:.1}", outcome.infer_ms)) {
        headers.insert(X_INFERENCE_MS.clone(), v);
    }
    if with_detections {
        if let Some(v) = detections_header(&outcome) {
            headers.insert(X_DETECTIONS.clone(), v);
        }
    }
    response
}

/// JSON detections as a header value; `None` (with a warning) when the
/// payload is not a legal header value, e.g. a label containing DEL.
fn detections_header(outcome: &UploadOutcome) -> Option<HeaderValue> {
    let payload = serde_json::to_string(&to_dtos(&outcome.detections)).unwrap_or_else(|_| "[]".into());
    match HeaderValue::from_str(&ascii_json(&payload)) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(
                request_id = %outcome.request_id,
                "dropping {} header ({} bytes): {}",
                X_DETECTIONS,
                payload.len(),
                e
            );
            None
        }
    }
}

/// Escapes non-ASCII characters as `\uXXXX` so the JSON fits in a header
/// value. Only valid inside JSON strings, which is the only place
/// `serde_json` emits them.
pub fn ascii_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}
