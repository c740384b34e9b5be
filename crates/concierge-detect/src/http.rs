//! Remote detection service.
//!
//! POSTs the snapshot as multipart (`image`, `confidence`, optional `model`)
//! and expects the detection JSON in the response body.

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use image::RgbImage;
use tracing::debug;

use concierge_core::{
    detection::Detector, domain::BoundingBox, errors::Error, imaging, utils::truncate_text, Result,
};

use crate::parse_detections;

#[derive(Clone, Debug)]
pub struct HttpDetector {
    url: String,
    model_name: Option<String>,
    http: reqwest::Client,
}

impl HttpDetector {
    pub fn new(url: impl Into<String>, model: Option<PathBuf>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("detector http client: {e}")))?;
        let model_name = model
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());
        Ok(Self {
            url: url.into(),
            model_name,
            http,
        })
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, image: &RgbImage, confidence: f32) -> Result<Vec<BoundingBox>> {
        let jpeg = imaging::encode_jpeg(image)?;

        let mut form = reqwest::multipart::Form::new()
            .text("confidence", confidence.to_string())
            .part(
                "image",
                reqwest::multipart::Part::bytes(jpeg)
                    .file_name("snapshot.jpg")
                    .mime_str("image/jpeg")
                    .map_err(|e| Error::Detection(format!("multipart error: {e}")))?,
            );
        if let Some(model) = &self.model_name {
            form = form.text("model", model.clone());
        }

        let resp = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Detection(format!("detector request error: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Detection(format!("detector body read error: {e}")))?;
        if !status.is_success() {
            return Err(Error::Detection(format!(
                "detector returned {status}: {}",
                truncate_text(&body, 200)
            )));
        }

        let boxes = parse_detections(&body, confidence)?;
        debug!(count = boxes.len(), "remote detection finished");
        Ok(boxes)
    }
}
