//! Detection adapters.
//!
//! The model runs elsewhere: either behind an HTTP endpoint or inside a local
//! detector process. Both speak the same small JSON format, parsed here.

use std::{sync::Arc, time::Duration};

use serde::Deserialize;

use concierge_core::{
    config::{Config, DetectorBackend},
    detection::Detector,
    domain::BoundingBox,
    errors::Error,
    Result,
};

pub mod command;
pub mod http;
pub mod provision;

pub use command::CommandDetector;
pub use http::HttpDetector;

const MODEL_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Build the configured detector, downloading the model first if needed.
pub async fn build_detector(cfg: &Config) -> Result<Arc<dyn Detector>> {
    let model = match &cfg.model_path {
        Some(path) => Some(
            provision::ensure_model(
                path,
                cfg.model_url.as_deref(),
                cfg.model_sha256.as_deref(),
                MODEL_DOWNLOAD_TIMEOUT,
            )
            .await?,
        ),
        None => None,
    };

    let detector: Arc<dyn Detector> = match &cfg.detector {
        DetectorBackend::Http { url } => {
            Arc::new(HttpDetector::new(url.clone(), model, cfg.detector_timeout)?)
        }
        DetectorBackend::Command { program, args } => Arc::new(CommandDetector::new(
            program.clone(),
            args.clone(),
            model,
            cfg.detector_timeout,
        )?),
    };
    Ok(detector)
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    #[serde(default, alias = "label", alias = "cls")]
    class: Option<serde_json::Value>,
    #[serde(default, alias = "conf", alias = "score")]
    confidence: Option<f32>,
    #[serde(rename = "box", alias = "bbox", alias = "xyxy")]
    bbox: [f64; 4],
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    List(Vec<RawDetection>),
    Wrapped { detections: Vec<RawDetection> },
}

impl RawDetection {
    /// Missing class means the producer already filtered to people.
    fn is_person(&self) -> bool {
        match &self.class {
            None => true,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("person"),
            Some(serde_json::Value::Number(n)) => n.as_u64() == Some(0),
            Some(_) => false,
        }
    }
}

/// Person boxes at or above `threshold` from a detector response.
pub fn parse_detections(body: &str, threshold: f32) -> Result<Vec<BoundingBox>> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let payload: Payload = serde_json::from_str(body)
        .map_err(|e| Error::Detection(format!("unexpected detector output: {e}")))?;
    let raw = match payload {
        Payload::List(v) => v,
        Payload::Wrapped { detections } => detections,
    };

    Ok(raw
        .into_iter()
        .filter(|d| d.is_person())
        .filter(|d| d.confidence.map_or(true, |c| c >= threshold))
        .map(|d| {
            let [x1, y1, x2, y2] = d.bbox;
            BoundingBox::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
        })
        .collect())
}
