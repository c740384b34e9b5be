use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;

use crate::{errors::Error, imaging, Result};

/// Camera snapshot source. Every failure surfaces as `Error::Acquisition`.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<RgbImage>;
}

/// Fetches a still image over HTTP (most IP cameras expose one).
#[derive(Clone, Debug)]
pub struct HttpSnapshotSource {
    url: String,
    http: reqwest::Client,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("snapshot http client: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<RgbImage> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Acquisition(format!("request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Acquisition(format!("camera returned {status}")));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Acquisition(format!("body read error: {e}")))?;
        if bytes.is_empty() {
            return Err(Error::Acquisition("camera returned an empty body".to_string()));
        }

        imaging::decode(&bytes).map_err(|e| Error::Acquisition(format!("decode error: {e}")))
    }
}
