use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::ChatId, errors::Error, Result};

pub const DEFAULT_DETECTOR_ARGS: &str = "--model {model} --conf {conf}";

/// How detections are obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetectorBackend {
    /// Remote detection service (multipart POST, JSON response).
    Http { url: String },
    /// Local detector process fed a JPEG on stdin.
    Command { program: PathBuf, args: Vec<String> },
}

/// Typed configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    /// Notification targets; also the allow-list for inbound callbacks.
    pub notify_user_ids: Vec<i64>,

    // Camera
    pub snapshot_url: String,
    pub snapshot_timeout: Duration,

    // Detection
    pub confidence_threshold: f32,
    pub detector: DetectorBackend,
    pub detector_timeout: Duration,
    pub model_path: Option<PathBuf>,
    pub model_url: Option<String>,
    pub model_sha256: Option<String>,

    // Behavior
    pub check_interval: Duration,
    pub debug: bool,
    pub notify_caption: String,
    pub callbacks_enabled: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        if let Some(extra) = env_path("CONCIERGE_ENV_FILE") {
            load_dotenv_if_present(&extra);
        }

        // Required env vars
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        let notify_user_ids = parse_csv_i64(env_str("NOTIFY_USER_IDS"));
        let snapshot_url = env_str("SNAPSHOT_URL").unwrap_or_default();

        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        if notify_user_ids.is_empty() {
            return Err(Error::Config(
                "NOTIFY_USER_IDS environment variable is required".to_string(),
            ));
        }
        if snapshot_url.trim().is_empty() {
            return Err(Error::Config(
                "SNAPSHOT_URL environment variable is required".to_string(),
            ));
        }

        let snapshot_timeout =
            Duration::from_secs(env_u64("SNAPSHOT_TIMEOUT_SECS").unwrap_or(10).max(1));

        let confidence_threshold = match env_str("CONFIDENCE_THRESHOLD") {
            Some(raw) => parse_threshold(&raw)?,
            None => 0.5,
        };

        let check_interval = match env_u64("CHECK_INTERVAL_SECONDS") {
            Some(0) => {
                return Err(Error::Config(
                    "CHECK_INTERVAL_SECONDS must be at least 1".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(2),
        };

        let detector = detector_backend(
            env_str("DETECTOR_URL").and_then(non_empty),
            env_path("DETECTOR_COMMAND"),
            env_str("DETECTOR_ARGS"),
        )?;
        let detector_timeout =
            Duration::from_secs(env_u64("DETECTOR_TIMEOUT_SECS").unwrap_or(30).max(1));

        let model_path = env_path("MODEL_PATH");
        let model_url = env_str("MODEL_URL").and_then(non_empty);
        let model_sha256 = env_str("MODEL_SHA256")
            .and_then(non_empty)
            .map(|s| s.trim().to_lowercase());
        if model_url.is_some() && model_path.is_none() {
            return Err(Error::Config(
                "MODEL_URL requires MODEL_PATH to be set".to_string(),
            ));
        }

        let debug = env_bool("DEBUG").unwrap_or(false);
        let notify_caption = env_str("NOTIFY_CAPTION")
            .and_then(non_empty)
            .unwrap_or_else(|| "arriving somebody".to_string());
        let callbacks_enabled = env_bool("CALLBACKS_ENABLED").unwrap_or(true);

        Ok(Self {
            telegram_bot_token,
            notify_user_ids,
            snapshot_url,
            snapshot_timeout,
            confidence_threshold,
            detector,
            detector_timeout,
            model_path,
            model_url,
            model_sha256,
            check_interval,
            debug,
            notify_caption,
            callbacks_enabled,
        })
    }
}

impl Config {
    /// Chats that receive detection notifications.
    pub fn targets(&self) -> Vec<ChatId> {
        self.notify_user_ids.iter().copied().map(ChatId).collect()
    }
}

fn detector_backend(
    url: Option<String>,
    program: Option<PathBuf>,
    args: Option<String>,
) -> Result<DetectorBackend> {
    if let Some(url) = url {
        return Ok(DetectorBackend::Http { url });
    }
    let Some(program) = program else {
        return Err(Error::Config(
            "either DETECTOR_URL or DETECTOR_COMMAND must be set".to_string(),
        ));
    };
    let args = args
        .unwrap_or_else(|| DEFAULT_DETECTOR_ARGS.to_string())
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();
    Ok(DetectorBackend::Command { program, args })
}

fn parse_threshold(raw: &str) -> Result<f32> {
    let v = raw
        .trim()
        .parse::<f32>()
        .map_err(|_| Error::Config(format!("CONFIDENCE_THRESHOLD is not a number: {raw}")))?;
    if !(0.0..=1.0).contains(&v) {
        return Err(Error::Config(format!(
            "CONFIDENCE_THRESHOLD must be within 0..=1, got {v}"
        )));
    }
    Ok(v)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
