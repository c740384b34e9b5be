use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use image::RgbImage;

use crate::{domain::BoundingBox, imaging, utils::clock_label, Result};

/// Person detector.
///
/// Implementations own their model/process/HTTP client; the controller holds
/// one instance created at startup.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Boxes of every person found with at least `confidence`.
    async fn detect(&self, image: &RgbImage, confidence: f32) -> Result<Vec<BoundingBox>>;
}

/// One cycle's worth of detections. Never outlives the cycle.
#[derive(Clone, Debug)]
pub struct DetectionEvent {
    pub at: Instant,
    pub captured_at: DateTime<Local>,
    pub boxes: Vec<BoundingBox>,
    pub raw: Arc<RgbImage>,
    pub annotated: RgbImage,
}

impl DetectionEvent {
    pub fn new(
        at: Instant,
        captured_at: DateTime<Local>,
        boxes: Vec<BoundingBox>,
        raw: Arc<RgbImage>,
    ) -> Self {
        let annotated = imaging::annotate(&raw, &boxes);
        Self {
            at,
            captured_at,
            boxes,
            raw,
            annotated,
        }
    }

    pub fn caption(&self, base: &str) -> String {
        let people = match self.boxes.len() {
            1 => "1 person".to_string(),
            n => format!("{n} persons"),
        };
        format!("{base} ({people}, {})", clock_label(self.captured_at))
    }
}
