use crate::domain::ChatId;

/// Whether `chat_id` may trigger callbacks. An empty allow-list admits nobody.
pub fn is_authorized(chat_id: ChatId, allowed: &[i64]) -> bool {
    allowed.contains(&chat_id.0)
}
