//! Model file provisioning.
//!
//! A configured model path that does not exist yet is downloaded from
//! `MODEL_URL` into `<path>.part`, checked against `MODEL_SHA256` when given,
//! and renamed into place. Existing files are used as-is.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::info;

use concierge_core::{errors::Error, Result};

pub async fn ensure_model(
    path: &Path,
    url: Option<&str>,
    sha256: Option<&str>,
    timeout: Duration,
) -> Result<PathBuf> {
    if tokio::fs::try_exists(path).await? {
        return Ok(path.to_path_buf());
    }

    let Some(url) = url else {
        return Err(Error::Config(format!(
            "model file {} not found and MODEL_URL is not set",
            path.display()
        )));
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!(url, path = %path.display(), "downloading model");
    let partial = partial_path(path);
    let digest = match download(url, &partial, timeout).await {
        Ok(digest) => digest,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
    };

    if let Some(expected) = sha256 {
        if !digest_matches(&digest, expected) {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(Error::External(format!(
                "model checksum mismatch: expected {}, got {digest}",
                expected.trim()
            )));
        }
    }

    tokio::fs::rename(&partial, path).await?;
    info!(path = %path.display(), sha256 = %digest, "model ready");
    Ok(path.to_path_buf())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn digest_matches(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected.trim())
}

/// Stream `url` into `dest`, returning the hex sha256 of what was written.
async fn download(url: &str, dest: &Path, timeout: Duration) -> Result<String> {
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::External(format!("download client: {e}")))?;

    let mut resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| Error::External(format!("model download failed: {e}")))?;
    if !resp.status().is_success() {
        return Err(Error::External(format!(
            "model download returned {}",
            resp.status()
        )));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut hasher = Sha256::new();
    while let Some(chunk) = resp
        .chunk()
        .await
        .map_err(|e| Error::External(format!("model download interrupted: {e}")))?
    {
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(format!("{:x}", hasher.finalize()))
}
