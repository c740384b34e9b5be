//! Notification coalescing.
//!
//! While a person stays in view the agent keeps refreshing the photo of the
//! notification it already sent instead of posting a new message every cycle.
//! Once no detection has happened for `COALESCE_WINDOW`, the next detection
//! starts a fresh notification.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::{
    domain::{ChatId, MessageRef},
    errors::Error,
    messaging::{port::NotificationPort, types::InlineKeyboard},
    Result,
};

pub const COALESCE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NotificationState {
    /// Nothing has been sent successfully yet.
    #[default]
    Idle,
    /// One message per target that received the latest notification.
    Notified {
        messages: Vec<MessageRef>,
        last_detection: Instant,
    },
}

/// Phase of the state machine at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    RecentlyNotified,
    Stale,
}

/// A notification ready to go out: JPEG bytes plus caption.
#[derive(Clone, Copy, Debug)]
pub struct Notification<'a> {
    pub jpeg: &'a [u8],
    pub caption: &'a str,
    pub keyboard: Option<&'a InlineKeyboard>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// Brand-new messages (fresh notification or edit fallback).
    pub sent: Vec<MessageRef>,
    /// Messages refreshed in place.
    pub edited: Vec<MessageRef>,
    /// Targets that received neither.
    pub failed: usize,
}

#[derive(Debug)]
pub struct Notifier {
    state: NotificationState,
    window: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_window(COALESCE_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            state: NotificationState::Idle,
            window,
        }
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    pub fn phase_at(&self, now: Instant) -> Phase {
        match &self.state {
            NotificationState::Idle => Phase::Idle,
            NotificationState::Notified { last_detection, .. } => {
                // A clock that reads earlier than the last detection counts as "inside".
                if now.saturating_duration_since(*last_detection) >= self.window {
                    Phase::Stale
                } else {
                    Phase::RecentlyNotified
                }
            }
        }
    }

    /// Deliver one detection event: edit in place inside the window, else send new.
    ///
    /// Returns `Error::Notification` only when no target got anything; the
    /// state is left untouched in that case.
    pub async fn notify(
        &mut self,
        port: &dyn NotificationPort,
        targets: &[ChatId],
        note: Notification<'_>,
        now: Instant,
    ) -> Result<NotifyOutcome> {
        let can_edit = port.capabilities().supports_edit;
        let (outcome, refreshed) = match (self.phase_at(now), &self.state) {
            (Phase::RecentlyNotified, NotificationState::Notified { messages, .. }) if can_edit => {
                let messages = messages.clone();
                let mut outcome = self.refresh(port, &messages, note).await;

                // Targets whose first send failed still get one, inside the window too.
                let missing: Vec<ChatId> = targets
                    .iter()
                    .copied()
                    .filter(|chat| !messages.iter().any(|m| m.chat_id == *chat))
                    .collect();
                if !missing.is_empty() {
                    let caught_up = self.broadcast(port, &missing, note).await;
                    outcome.sent.extend(caught_up.sent);
                    outcome.failed += caught_up.failed;
                }
                (outcome, Some(messages))
            }
            (phase, _) => {
                debug!(?phase, "starting a new notification");
                (self.broadcast(port, targets, note).await, None)
            }
        };

        if outcome.sent.is_empty() && outcome.edited.is_empty() {
            return Err(Error::Notification(format!(
                "no target received the notification ({} failed)",
                outcome.failed
            )));
        }

        let messages = match refreshed {
            Some(previous) => merge_refs(&previous, &outcome.sent),
            None => outcome.sent.clone(),
        };
        let last_detection = match &self.state {
            NotificationState::Notified { last_detection, .. } => (*last_detection).max(now),
            NotificationState::Idle => now,
        };
        self.state = NotificationState::Notified {
            messages,
            last_detection,
        };

        Ok(outcome)
    }

    async fn broadcast(
        &self,
        port: &dyn NotificationPort,
        targets: &[ChatId],
        note: Notification<'_>,
    ) -> NotifyOutcome {
        let mut outcome = NotifyOutcome::default();
        for &chat_id in targets {
            match port
                .send_photo(chat_id, note.jpeg, note.caption, note.keyboard)
                .await
            {
                Ok(msg) => {
                    info!(chat_id = chat_id.0, message_id = msg.message_id.0, "notification sent");
                    outcome.sent.push(msg);
                }
                Err(e) => {
                    warn!(chat_id = chat_id.0, "failed to send notification: {e}");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    async fn refresh(
        &self,
        port: &dyn NotificationPort,
        messages: &[MessageRef],
        note: Notification<'_>,
    ) -> NotifyOutcome {
        let mut outcome = NotifyOutcome::default();
        for &msg in messages {
            match port
                .edit_photo(msg, note.jpeg, note.caption, note.keyboard)
                .await
            {
                Ok(()) => {
                    debug!(chat_id = msg.chat_id.0, message_id = msg.message_id.0, "notification refreshed");
                    outcome.edited.push(msg);
                }
                Err(e) => {
                    warn!(
                        chat_id = msg.chat_id.0,
                        message_id = msg.message_id.0,
                        "edit failed, sending a new notification instead: {e}"
                    );
                    match port
                        .send_photo(msg.chat_id, note.jpeg, note.caption, note.keyboard)
                        .await
                    {
                        Ok(new_msg) => {
                            info!(
                                chat_id = new_msg.chat_id.0,
                                message_id = new_msg.message_id.0,
                                "notification re-sent"
                            );
                            outcome.sent.push(new_msg);
                        }
                        Err(e) => {
                            warn!(chat_id = msg.chat_id.0, "fallback send failed: {e}");
                            outcome.failed += 1;
                        }
                    }
                }
            }
        }
        outcome
    }
}

/// Replace refs per chat with freshly sent ones and append chats seen for the first time.
/// Chats without a new ref keep the old one.
fn merge_refs(existing: &[MessageRef], fresh: &[MessageRef]) -> Vec<MessageRef> {
    let mut merged: Vec<MessageRef> = existing
        .iter()
        .map(|old| {
            fresh
                .iter()
                .find(|m| m.chat_id == old.chat_id)
                .copied()
                .unwrap_or(*old)
        })
        .collect();
    merged.extend(
        fresh
            .iter()
            .filter(|m| !existing.iter().any(|old| old.chat_id == m.chat_id))
            .copied(),
    );
    merged
}
