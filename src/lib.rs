//! Real-time balance notifications for the bank front end.
//!
//! A [`NotificationChannel`] holds one WebSocket per signed-in user,
//! authenticates it, and turns `balance_update` pushes into a toast and a
//! [`BalanceChanged`] signal on the shared [`BalanceBus`].

pub mod bus;
pub mod channel;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod session;
pub mod toast;
pub mod types;

pub use bus::{BalanceBus, EventBus, SubscriberId, Subscription};
pub use channel::NotificationChannel;
pub use config::Config;
pub use endpoint::endpoint_for_page;
pub use error::{ChannelError, Result};
pub use session::{ChannelSession, Collaborators, ConnectionState, TransportEvent};
pub use toast::{LogToaster, QueueToaster, Toast, Toaster, BALANCE_TOAST_DURATION};
pub use types::{decode_notification, BalanceChanged, BalanceUpdate, ClientMessage, Notification};
