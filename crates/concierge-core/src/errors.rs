/// Core error type for the concierge agent.
///
/// Adapter crates map their specific errors into this type so the poll loop
/// can classify a failed cycle (skip quietly vs report to operators).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot acquisition failed: {0}")]
    Acquisition(String),

    #[error("detection failed: {0}")]
    Detection(String),

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("callback failed: {0}")]
    Callback(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Acquisition failures end a cycle early and are not forwarded to operators.
    pub fn is_acquisition(&self) -> bool {
        matches!(self, Error::Acquisition(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
