use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::detection::Detection;

/// How detections reach the client after an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// `X-Detections` response header only.
    Header,
    /// Recorded for `GET /detections` only.
    Query,
    Both,
}

impl DeliveryMode {
    pub fn in_header(self) -> bool {
        matches!(self, DeliveryMode::Header | DeliveryMode::Both)
    }

    pub fn records(self) -> bool {
        matches!(self, DeliveryMode::Query | DeliveryMode::Both)
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeliveryMode::Header => "header",
            DeliveryMode::Query => "query",
            DeliveryMode::Both => "both",
        };
        f.write_str(s)
    }
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" => Ok(DeliveryMode::Header),
            "query" | "poll" => Ok(DeliveryMode::Query),
            "both" => Ok(DeliveryMode::Both),
            other => Err(format!("unknown delivery mode `{other}` (expected header, query or both)")),
        }
    }
}

/// Result of one processed upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub request_id: Uuid,
    pub jpeg: Vec<u8>,
    pub detections: Vec<Detection>,
    pub width: u32,
    pub height: u32,
    pub infer_ms: f32,
}
