//! Local detector process.
//!
//! The snapshot JPEG is written to the child's stdin and the detection JSON is
//! read from its stdout. `{model}` and `{conf}` in the arguments are replaced
//! per call. One process per frame keeps the agent free of model runtimes.

use std::{path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use image::RgbImage;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::debug;

use concierge_core::{detection::Detector, domain::BoundingBox, errors::Error, imaging, Result};

use crate::parse_detections;

const STDERR_TAIL_MAX_LINES: usize = 20;
const STDERR_TAIL_MAX_BYTES: usize = 2000;

#[derive(Clone, Debug)]
pub struct CommandDetector {
    program: PathBuf,
    args: Vec<String>,
    model: Option<PathBuf>,
    timeout: Duration,
}

impl CommandDetector {
    pub fn new(
        program: PathBuf,
        args: Vec<String>,
        model: Option<PathBuf>,
        timeout: Duration,
    ) -> Result<Self> {
        if model.is_none() && args.iter().any(|a| a.contains("{model}")) {
            return Err(Error::Config(
                "DETECTOR_ARGS references {model} but MODEL_PATH is not set".to_string(),
            ));
        }
        Ok(Self {
            program,
            args,
            model,
            timeout,
        })
    }

    fn render_args(&self, confidence: f32) -> Vec<String> {
        let model = self
            .model
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let conf = confidence.to_string();
        self.args
            .iter()
            .map(|a| a.replace("{model}", &model).replace("{conf}", &conf))
            .collect()
    }

    async fn run(&self, jpeg: Vec<u8>, args: Vec<String>) -> Result<std::process::Output> {
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Detection(format!("failed to start {}: {e}", self.program.display()))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Detection("detector stdin unavailable".to_string()))?;
        let feed = async move {
            stdin.write_all(&jpeg).await?;
            stdin.shutdown().await
        };

        // Feed and drain together so a chatty child never blocks on a full pipe.
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        if output.status.success() {
            fed.map_err(|e| Error::Detection(format!("failed to write frame to detector: {e}")))?;
        }
        Ok(output)
    }
}

#[async_trait]
impl Detector for CommandDetector {
    async fn detect(&self, image: &RgbImage, confidence: f32) -> Result<Vec<BoundingBox>> {
        let jpeg = imaging::encode_jpeg(image)?;
        let args = self.render_args(confidence);

        let output = tokio::time::timeout(self.timeout, self.run(jpeg, args))
            .await
            .map_err(|_| {
                Error::Detection(format!("detector timed out after {:?}", self.timeout))
            })??;

        if !output.status.success() {
            let stderr = stderr_tail(&String::from_utf8_lossy(&output.stderr));
            return Err(Error::Detection(format!(
                "detector exited with {}{}",
                output.status,
                if stderr.is_empty() {
                    String::new()
                } else {
                    format!(": {stderr}")
                }
            )));
        }

        let boxes = parse_detections(&String::from_utf8_lossy(&output.stdout), confidence)?;
        debug!(count = boxes.len(), "local detection finished");
        Ok(boxes)
    }
}

/// Last few lines of stderr, bounded in size.
fn stderr_tail(stderr: &str) -> String {
    let mut lines: Vec<&str> = stderr
        .lines()
        .rev()
        .filter(|l| !l.trim().is_empty())
        .take(STDERR_TAIL_MAX_LINES)
        .collect();
    lines.reverse();

    let mut tail = lines.join("\n");
    if tail.len() > STDERR_TAIL_MAX_BYTES {
        let mut start = tail.len() - STDERR_TAIL_MAX_BYTES;
        while !tail.is_char_boundary(start) {
            start += 1;
        }
        tail = tail[start..].to_string();
    }
    tail
}
