//! Telegram adapter (teloxide).
//!
//! Implements the `concierge-core` NotificationPort over the Bot API. Callback
//! queries are pulled with short `getUpdates` polls from the agent loop, so no
//! dispatcher or webhook runs alongside it.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{
        AllowedUpdate, CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, InputFile,
        InputMedia, InputMediaPhoto, UpdateKind,
    },
};

use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, info};

use concierge_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::NotificationPort,
        types::{InlineKeyboard, MessagingCapabilities, PendingCallback},
    },
    Result,
};

const PHOTO_FILE_NAME: &str = "snapshot.jpg";

/// The `getUpdates` offset lives in memory only. Telegram confirms updates when
/// the next poll passes a higher offset, so callbacks from the last poll before
/// a restart are delivered again after startup. Their queries have usually
/// expired by then; the acknowledgment fails and is logged, the reply is sent.
pub struct TelegramNotifier {
    bot: Bot,
    offset: Mutex<i32>,
}

/// Create the notifier and check the token against the Bot API.
pub async fn connect(token: &str) -> anyhow::Result<TelegramNotifier> {
    let bot = Bot::new(token);
    let me = bot.get_me().await?;
    info!(username = %me.username(), "telegram bot connected");
    Ok(TelegramNotifier::new(bot))
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            offset: Mutex::new(0),
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn photo(jpeg: &[u8]) -> InputFile {
        InputFile::memory(jpeg.to_vec()).file_name(PHOTO_FILE_NAME)
    }

    fn markup(keyboard: &InlineKeyboard) -> InlineKeyboardMarkup {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .buttons
            .iter()
            .map(|b| {
                vec![InlineKeyboardButton::callback(
                    b.label.clone(),
                    b.callback_data.clone(),
                )]
            })
            .collect();
        InlineKeyboardMarkup::new(rows)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Notification(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(teloxide::RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    sleep(d).await;
                }
                Err(other) => return Err(Self::map_err(other)),
            }
        }
    }
}

/// Offset for the next `getUpdates` call; everything fetched is consumed.
fn next_offset(current: i32, update_ids: impl IntoIterator<Item = i32>) -> i32 {
    update_ids
        .into_iter()
        .map(|id| id.saturating_add(1))
        .fold(current, i32::max)
}

fn pending_from(q: CallbackQuery) -> PendingCallback {
    let message = q.message.as_ref().map(|m| MessageRef {
        chat_id: ChatId(m.chat.id.0),
        message_id: MessageId(m.id.0),
    });
    // Without a message (inline mode) the private chat with the presser is the only reply target.
    let chat_id = message
        .map(|m| m.chat_id)
        .unwrap_or(ChatId(q.from.id.0 as i64));

    PendingCallback {
        callback_id: q.id,
        chat_id,
        user_id: UserId(q.from.id.0 as i64),
        username: q.from.username,
        data: q.data.unwrap_or_default(),
        message,
    }
}

#[async_trait]
impl NotificationPort for TelegramNotifier {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_edit: true,
            supports_inline_keyboards: true,
            supports_callbacks: true,
            max_caption_len: 1024,
            max_message_len: 4096,
        }
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        jpeg: &[u8],
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        let markup = keyboard.map(Self::markup);
        let msg = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .send_photo(Self::tg_chat(chat_id), Self::photo(jpeg))
                    .caption(caption.to_string());
                if let Some(m) = &markup {
                    req = req.reply_markup(m.clone());
                }
                req
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn edit_photo(
        &self,
        msg: MessageRef,
        jpeg: &[u8],
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        let markup = keyboard.map(Self::markup);
        self.with_retry(|| {
            let media = InputMedia::Photo(
                InputMediaPhoto::new(Self::photo(jpeg)).caption(caption.to_string()),
            );
            let mut req = self.bot.edit_message_media(
                Self::tg_chat(msg.chat_id),
                Self::tg_msg_id(msg.message_id),
                media,
            );
            if let Some(m) = &markup {
                req = req.reply_markup(m.clone());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn poll_actions(&self) -> Result<Vec<PendingCallback>> {
        let mut offset = self.offset.lock().await;
        let current = *offset;
        let updates = self
            .with_retry(|| {
                self.bot
                    .get_updates()
                    .offset(current)
                    .timeout(0)
                    .allowed_updates(vec![AllowedUpdate::CallbackQuery])
            })
            .await?;

        *offset = next_offset(current, updates.iter().map(|u| u.id));

        let callbacks: Vec<PendingCallback> = updates
            .into_iter()
            .filter_map(|u| match u.kind {
                UpdateKind::CallbackQuery(q) => Some(pending_from(q)),
                _ => None,
            })
            .collect();
        if !callbacks.is_empty() {
            debug!(count = callbacks.len(), offset = *offset, "callbacks received");
        }
        Ok(callbacks)
    }

    async fn acknowledge(&self, callback: &PendingCallback, text: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self
                .bot
                .answer_callback_query(callback.callback_id.clone());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }
}
