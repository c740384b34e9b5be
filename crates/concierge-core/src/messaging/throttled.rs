//! Outbound pacing for the notification channel.
//!
//! A cycle sends at most one photo (or edit) per operator, but a burst of
//! callbacks or debug forwards can follow it immediately. Calls to the same
//! chat are spaced by `per_chat_gap`, and all calls by `min_gap`.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{
        port::NotificationPort,
        types::{InlineKeyboard, MessagingCapabilities, PendingCallback},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    pub min_gap: Duration,
    pub per_chat_gap: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_gap: Duration::from_millis(40),
            per_chat_gap: Duration::from_millis(1050),
        }
    }
}

/// Start times of the most recently granted calls.
#[derive(Debug, Default)]
struct Slots {
    last_any: Option<Instant>,
    last_per_chat: HashMap<ChatId, Instant>,
}

impl Slots {
    /// Grant the earliest start for a call (to `chat`, if any) and return the wait until then.
    fn claim(&mut self, cfg: &ThrottleConfig, chat: Option<ChatId>, now: Instant) -> Duration {
        let mut start = now;
        if let Some(prev) = self.last_any {
            start = start.max(prev + cfg.min_gap);
        }
        if let Some(prev) = chat.and_then(|c| self.last_per_chat.get(&c)) {
            start = start.max(*prev + cfg.per_chat_gap);
        }

        self.last_any = Some(start);
        if let Some(c) = chat {
            self.last_per_chat.insert(c, start);
        }
        start - now
    }
}

/// NotificationPort decorator that paces outbound calls.
///
/// Polling inbound callbacks is not paced; it does not count against
/// Telegram's send limits.
pub struct ThrottledNotifier {
    inner: Arc<dyn NotificationPort>,
    cfg: ThrottleConfig,
    slots: Mutex<Slots>,
}

impl ThrottledNotifier {
    pub fn new(inner: Arc<dyn NotificationPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            slots: Mutex::new(Slots::default()),
        }
    }

    async fn pace(&self, chat: Option<ChatId>) {
        let wait = self.slots.lock().await.claim(&self.cfg, chat, Instant::now());
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl NotificationPort for ThrottledNotifier {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        jpeg: &[u8],
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        self.pace(Some(chat_id)).await;
        self.inner.send_photo(chat_id, jpeg, caption, keyboard).await
    }

    async fn edit_photo(
        &self,
        msg: MessageRef,
        jpeg: &[u8],
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        self.pace(Some(msg.chat_id)).await;
        self.inner.edit_photo(msg, jpeg, caption, keyboard).await
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.pace(Some(chat_id)).await;
        self.inner.send_text(chat_id, text).await
    }

    async fn poll_actions(&self) -> Result<Vec<PendingCallback>> {
        self.inner.poll_actions().await
    }

    async fn acknowledge(&self, callback: &PendingCallback, text: Option<&str>) -> Result<()> {
        // Answers are not chat messages; only the global gap applies.
        self.pace(None).await;
        self.inner.acknowledge(callback, text).await
    }
}
