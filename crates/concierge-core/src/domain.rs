/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Axis-aligned detection box in pixel coordinates (top-left, bottom-right).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    /// Normalise corner order and clamp into a `width` x `height` frame.
    ///
    /// Returns `None` when nothing of the box lies inside the frame.
    pub fn clamped(&self, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let max_x = width as i32 - 1;
        let max_y = height as i32 - 1;
        let (lx, hx) = (self.x1.min(self.x2), self.x1.max(self.x2));
        let (ly, hy) = (self.y1.min(self.y2), self.y1.max(self.y2));
        if hx < 0 || hy < 0 || lx > max_x || ly > max_y {
            return None;
        }
        Some(Self {
            x1: lx.clamp(0, max_x),
            y1: ly.clamp(0, max_y),
            x2: hx.clamp(0, max_x),
            y2: hy.clamp(0, max_y),
        })
    }
}
