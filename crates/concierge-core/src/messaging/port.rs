use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{InlineKeyboard, MessagingCapabilities, PendingCallback},
    Result,
};

/// Outbound notifications plus the inbound button-press queue.
///
/// Photos are passed already JPEG-encoded so adapters never touch pixels.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        jpeg: &[u8],
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef>;

    /// Replace the photo (and caption) of an existing message.
    async fn edit_photo(
        &self,
        msg: MessageRef,
        jpeg: &[u8],
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()>;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Inline-button presses delivered since the last poll and not yet acknowledged.
    async fn poll_actions(&self) -> Result<Vec<PendingCallback>>;

    /// Mark a delivered callback as handled so it is never redelivered.
    async fn acknowledge(&self, callback: &PendingCallback, text: Option<&str>) -> Result<()>;
}
