//! Inline-button callbacks ("take a photo now").
//!
//! Every delivered callback is acknowledged exactly once, whatever happened
//! while handling it. Failures are logged here and never reach the poll loop.

use chrono::Local;
use image::RgbImage;
use tracing::{debug, info, warn};

use crate::{
    imaging,
    messaging::{
        port::NotificationPort,
        types::{CallbackAction, PendingCallback},
    },
    security::is_authorized,
    utils::clock_label,
    Result,
};

pub const ACCESS_DENIED_TEXT: &str = "⛔ Access denied.";
pub const PLEASE_WAIT_TEXT: &str = "⏳ Please wait, processing...";

/// What a single callback resulted in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Denied,
    PhotoSent,
    PleaseWait,
    Ignored,
    Failed(String),
}

/// Poll the channel and handle every pending callback. Returns how many were handled.
pub async fn dispatch_pending(
    port: &dyn NotificationPort,
    allowed: &[i64],
    last_raw: Option<&RgbImage>,
) -> usize {
    let callbacks = match port.poll_actions().await {
        Ok(v) => v,
        Err(e) => {
            warn!("failed to poll callbacks: {e}");
            return 0;
        }
    };

    for cb in &callbacks {
        dispatch(port, allowed, cb, last_raw).await;
    }
    callbacks.len()
}

/// Handle one callback and acknowledge it.
pub async fn dispatch(
    port: &dyn NotificationPort,
    allowed: &[i64],
    cb: &PendingCallback,
    last_raw: Option<&RgbImage>,
) -> DispatchOutcome {
    let authorized = is_authorized(cb.chat_id, allowed);
    let outcome = if authorized {
        match respond(port, cb, last_raw).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(chat_id = cb.chat_id.0, data = %cb.data, "callback response failed: {e}");
                DispatchOutcome::Failed(e.to_string())
            }
        }
    } else {
        warn!(
            chat_id = cb.chat_id.0,
            user_id = cb.user_id.0,
            username = cb.username.as_deref().unwrap_or("unknown"),
            "callback from unauthorized chat"
        );
        if let Err(e) = port.send_text(cb.chat_id, ACCESS_DENIED_TEXT).await {
            warn!(chat_id = cb.chat_id.0, "failed to send access-denied reply: {e}");
        }
        DispatchOutcome::Denied
    };

    let ack_text = matches!(outcome, DispatchOutcome::Denied).then_some("Unauthorized");
    if let Err(e) = port.acknowledge(cb, ack_text).await {
        warn!(callback_id = %cb.callback_id, "failed to acknowledge callback: {e}");
    }

    outcome
}

async fn respond(
    port: &dyn NotificationPort,
    cb: &PendingCallback,
    last_raw: Option<&RgbImage>,
) -> Result<DispatchOutcome> {
    match cb.action() {
        CallbackAction::CaptureNow => match last_raw {
            Some(raw) => {
                let jpeg = imaging::encode_jpeg(raw)?;
                let caption = format!("📸 Snapshot {}", clock_label(Local::now()));
                port.send_photo(cb.chat_id, &jpeg, &caption, None).await?;
                info!(chat_id = cb.chat_id.0, "snapshot sent on request");
                Ok(DispatchOutcome::PhotoSent)
            }
            None => {
                port.send_text(cb.chat_id, PLEASE_WAIT_TEXT).await?;
                Ok(DispatchOutcome::PleaseWait)
            }
        },
        CallbackAction::Unknown(data) => {
            debug!(chat_id = cb.chat_id.0, %data, "ignoring unsupported callback");
            Ok(DispatchOutcome::Ignored)
        }
    }
}
