use crate::domain::{ChatId, MessageRef, UserId};

/// Callback data carried by the "capture now" inline button.
pub const CAPTURE_NOW: &str = "capture_now";

/// One inbound inline-button press awaiting dispatch and acknowledgment.
#[derive(Clone, Debug)]
pub struct PendingCallback {
    pub callback_id: String,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub data: String,
    pub message: Option<MessageRef>,
}

impl PendingCallback {
    pub fn action(&self) -> CallbackAction {
        CallbackAction::parse(&self.data)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    CaptureNow,
    Unknown(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        match data.trim() {
            CAPTURE_NOW => CallbackAction::CaptureNow,
            other => CallbackAction::Unknown(other.to_string()),
        }
    }
}

/// Inline keyboard (buttons) attached to outgoing notifications.
#[derive(Clone, Debug)]
pub struct InlineKeyboard {
    pub buttons: Vec<InlineButton>,
}

#[derive(Clone, Debug)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineKeyboard {
    pub fn new(buttons: Vec<InlineButton>) -> Self {
        Self { buttons }
    }

    /// Single "take a photo now" button.
    pub fn capture_now() -> Self {
        Self::new(vec![InlineButton {
            label: "📸 Capture now".to_string(),
            callback_data: CAPTURE_NOW.to_string(),
        }])
    }
}

/// Capabilities / feature flags of a notification channel.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_edit: bool,
    pub supports_inline_keyboards: bool,
    pub supports_callbacks: bool,
    pub max_caption_len: usize,
    pub max_message_len: usize,
}
