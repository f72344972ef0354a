use thiserror::Error;

/// Failures inside the notification channel.
///
/// None of these reach the owner of a `NotificationChannel`; they are logged
/// and folded into the connection state.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("failed to decode notification: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode outbound message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("cannot derive endpoint from page url '{url}': {reason}")]
    Endpoint { url: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ChannelError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ChannelError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
