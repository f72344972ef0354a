use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How long a balance toast stays on screen
pub const BALANCE_TOAST_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub message: String,
    pub duration: Duration,
}

/// Presents transient alerts to the user.
///
/// `show` must return immediately; callers never wait for dismissal.
pub trait Toaster: Send + Sync {
    fn show(&self, toast: Toast);
}

/// Renders toasts into the log
#[derive(Debug, Default, Clone)]
pub struct LogToaster;

impl Toaster for LogToaster {
    fn show(&self, toast: Toast) {
        info!(
            "[toast {}ms] {}: {}",
            toast.duration.as_millis(),
            toast.title,
            toast.message
        );
    }
}

/// Hands toasts to whatever UI layer drains the receiver
#[derive(Debug, Clone)]
pub struct QueueToaster {
    tx: mpsc::UnboundedSender<Toast>,
}

impl QueueToaster {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Toast>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Toaster for QueueToaster {
    fn show(&self, toast: Toast) {
        if let Err(e) = self.tx.send(toast) {
            warn!("Toast dropped, presenter is gone: {}", e.0.title);
        }
    }
}
