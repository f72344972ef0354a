use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::bus::BalanceBus;
use crate::toast::{Toast, Toaster, BALANCE_TOAST_DURATION};
use crate::types::{decode_notification, BalanceChanged, ClientMessage, Notification};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No identity, or torn down
    Absent,
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// What the transport reports to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed,
    Error(String),
}

/// Services the session drives when a balance update arrives
#[derive(Clone)]
pub struct Collaborators {
    pub toaster: Arc<dyn Toaster>,
    pub bus: Arc<BalanceBus>,
}

/// State machine for a single connection.
///
/// Events are handled one at a time, in arrival order. Once `teardown` has
/// run, every later event is ignored.
pub struct ChannelSession {
    user_id: String,
    collaborators: Collaborators,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    auth_sent: bool,
    torn_down: bool,
}

impl ChannelSession {
    pub fn new(
        user_id: String,
        collaborators: Collaborators,
        state_tx: Arc<watch::Sender<ConnectionState>>,
    ) -> Self {
        state_tx.send_replace(ConnectionState::Connecting);
        Self {
            user_id,
            collaborators,
            state_tx,
            auth_sent: false,
            torn_down: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Apply one transport event. Returns a message the driver must send.
    pub async fn handle(&mut self, event: TransportEvent) -> Option<ClientMessage> {
        if self.torn_down {
            trace!("Session for {} torn down, ignoring {:?}", self.user_id, event);
            return None;
        }

        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Message(text) => {
                self.on_message(&text).await;
                None
            }
            TransportEvent::Closed => {
                info!("Notification channel for {} closed", self.user_id);
                self.set_state(ConnectionState::Disconnected);
                None
            }
            TransportEvent::Error(e) => {
                warn!("Notification channel for {} failed: {}", self.user_id, e);
                self.set_state(ConnectionState::Disconnected);
                None
            }
        }
    }

    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.set_state(ConnectionState::Absent);
        debug!("Session for {} torn down", self.user_id);
    }

    fn on_open(&mut self) -> Option<ClientMessage> {
        if self.auth_sent {
            debug!("Duplicate open for {}, already authenticated", self.user_id);
            return None;
        }
        self.auth_sent = true;
        self.set_state(ConnectionState::Connected);
        info!("Notification channel open, authenticating {}", self.user_id);

        Some(ClientMessage::Authenticate {
            user_id: self.user_id.clone(),
        })
    }

    async fn on_message(&mut self, text: &str) {
        let notification = match decode_notification(text) {
            Ok(n) => n,
            Err(e) => {
                warn!("{} - payload: {}", e, preview(text));
                return;
            }
        };

        match notification {
            Notification::BalanceUpdate(update) => {
                debug!("Balance update for {}: {:?}", self.user_id, update.new_balance);

                self.collaborators.toaster.show(Toast {
                    title: update.title,
                    message: update.message,
                    duration: BALANCE_TOAST_DURATION,
                });

                self.collaborators
                    .bus
                    .publish(BalanceChanged {
                        new_balance: update.new_balance,
                    })
                    .await;
            }
            Notification::Other => {
                trace!("Ignoring notification: {}", preview(text));
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Channel state {:?} -> {:?}", previous, state);
        }
    }
}

/// First 200 characters of a frame, for logging
fn preview(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
