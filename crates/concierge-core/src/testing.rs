//! Hand-written fake ports shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgb, RgbImage};

use crate::{
    config::{Config, DetectorBackend},
    detection::Detector,
    domain::{BoundingBox, ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::NotificationPort,
        types::{InlineKeyboard, MessagingCapabilities, PendingCallback},
    },
    snapshot::SnapshotSource,
    Result,
};

pub(crate) fn test_config(targets: Vec<i64>) -> Config {
    Config {
        telegram_bot_token: "123:abc".to_string(),
        notify_user_ids: targets,
        snapshot_url: "http://camera.local/snapshot.jpg".to_string(),
        snapshot_timeout: Duration::from_secs(1),
        confidence_threshold: 0.5,
        check_interval: Duration::from_millis(10),
        debug: false,
        notify_caption: "arriving somebody".to_string(),
        callbacks_enabled: true,
        detector: DetectorBackend::Http {
            url: "http://detector.local/detect".to_string(),
        },
        detector_timeout: Duration::from_secs(1),
        model_path: None,
        model_url: None,
        model_sha256: None,
    }
}

pub(crate) fn frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([10, 10, 10]))
}

#[derive(Clone, Debug)]
pub(crate) struct PhotoSend {
    pub chat_id: ChatId,
    pub caption: String,
    pub with_keyboard: bool,
    pub msg: MessageRef,
}

#[derive(Default)]
pub(crate) struct FakeNotifier {
    next_id: Mutex<i32>,
    photo_sends: Mutex<Vec<PhotoSend>>,
    edits: Mutex<Vec<MessageRef>>,
    texts: Mutex<Vec<(ChatId, String)>>,
    acks: Mutex<Vec<(String, Option<String>)>>,
    pending: Mutex<Vec<PendingCallback>>,
    failing_send_chats: Mutex<Vec<ChatId>>,
    pub fail_edits: AtomicBool,
    pub fail_sends: AtomicBool,
    pub fail_texts: AtomicBool,
    pub fail_acks: AtomicBool,
    pub fail_poll: AtomicBool,
    pub no_edit: AtomicBool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(1),
            ..Default::default()
        }
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        let id = *guard;
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(id),
        }
    }

    pub fn fail_sends_to(&self, chat_id: ChatId) {
        self.failing_send_chats.lock().unwrap().push(chat_id);
    }

    pub fn clear_send_failures(&self) {
        self.failing_send_chats.lock().unwrap().clear();
    }

    pub fn push_callback(&self, cb: PendingCallback) {
        self.pending.lock().unwrap().push(cb);
    }

    pub fn photo_sends(&self) -> Vec<PhotoSend> {
        self.photo_sends.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<MessageRef> {
        self.edits.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<(ChatId, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn acks(&self) -> Vec<(String, Option<String>)> {
        self.acks.lock().unwrap().clone()
    }
}

pub(crate) fn callback(id: &str, chat: i64, data: &str) -> PendingCallback {
    PendingCallback {
        callback_id: id.to_string(),
        chat_id: ChatId(chat),
        user_id: UserId(chat),
        username: Some("operator".to_string()),
        data: data.to_string(),
        message: None,
    }
}

#[async_trait]
impl NotificationPort for FakeNotifier {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_edit: !self.no_edit.load(Ordering::SeqCst),
            supports_inline_keyboards: true,
            supports_callbacks: true,
            max_caption_len: 1024,
            max_message_len: 4096,
        }
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        _jpeg: &[u8],
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        if self.fail_sends.load(Ordering::SeqCst)
            || self.failing_send_chats.lock().unwrap().contains(&chat_id)
        {
            return Err(Error::Notification("send rejected".to_string()));
        }
        let msg = self.alloc(chat_id);
        self.photo_sends.lock().unwrap().push(PhotoSend {
            chat_id,
            caption: caption.to_string(),
            with_keyboard: keyboard.is_some(),
            msg,
        });
        Ok(msg)
    }

    async fn edit_photo(
        &self,
        msg: MessageRef,
        _jpeg: &[u8],
        _caption: &str,
        _keyboard: Option<&InlineKeyboard>,
    ) -> Result<()> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(Error::Notification("message to edit not found".to_string()));
        }
        self.edits.lock().unwrap().push(msg);
        Ok(())
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        if self.fail_texts.load(Ordering::SeqCst) {
            return Err(Error::Notification("text rejected".to_string()));
        }
        self.texts.lock().unwrap().push((chat_id, text.to_string()));
        Ok(self.alloc(chat_id))
    }

    async fn poll_actions(&self) -> Result<Vec<PendingCallback>> {
        if self.fail_poll.load(Ordering::SeqCst) {
            return Err(Error::Callback("getUpdates timed out".to_string()));
        }
        Ok(std::mem::take(&mut *self.pending.lock().unwrap()))
    }

    async fn acknowledge(&self, callback: &PendingCallback, text: Option<&str>) -> Result<()> {
        self.acks
            .lock()
            .unwrap()
            .push((callback.callback_id.clone(), text.map(|t| t.to_string())));
        if self.fail_acks.load(Ordering::SeqCst) {
            return Err(Error::Callback("query is too old".to_string()));
        }
        Ok(())
    }
}

/// Snapshot source replaying queued results; `None` entries fail acquisition.
#[derive(Default)]
pub(crate) struct FakeSource {
    frames: Mutex<VecDeque<Option<RgbImage>>>,
}

impl FakeSource {
    pub fn new(frames: Vec<Option<RgbImage>>) -> Self {
        Self {
            frames: Mutex::new(frames.into()),
        }
    }
}

#[async_trait]
impl SnapshotSource for FakeSource {
    async fn fetch(&self) -> Result<RgbImage> {
        match self.frames.lock().unwrap().pop_front() {
            Some(Some(img)) => Ok(img),
            _ => Err(Error::Acquisition("connection refused".to_string())),
        }
    }
}

/// Detector replaying queued box sets; `None` entries fail detection.
#[derive(Default)]
pub(crate) struct FakeDetector {
    results: Mutex<VecDeque<Option<Vec<BoundingBox>>>>,
    calls: Mutex<Vec<f32>>,
}

impl FakeDetector {
    pub fn new(results: Vec<Option<Vec<BoundingBox>>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn thresholds(&self) -> Vec<f32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Detector for FakeDetector {
    async fn detect(&self, _image: &RgbImage, confidence: f32) -> Result<Vec<BoundingBox>> {
        self.calls.lock().unwrap().push(confidence);
        match self.results.lock().unwrap().pop_front() {
            Some(Some(boxes)) => Ok(boxes),
            Some(None) => Err(Error::Detection("model crashed".to_string())),
            None => Ok(Vec::new()),
        }
    }
}
