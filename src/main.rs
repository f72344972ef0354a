use anyhow::{Context, Result};
use notification_channel::{
    BalanceBus, Collaborators, Config, ConnectionState, LogToaster, NotificationChannel,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    let endpoint = config.endpoint()?;

    info!("Starting notification channel");
    info!("Page URL: {}", config.page_url);
    info!("Endpoint: {}", endpoint);
    match &config.user_id {
        Some(id) => info!("User: {}", id),
        None => warn!("NOTIFY_USER_ID not set, channel will stay idle"),
    }

    let bus = Arc::new(BalanceBus::new(config.balance_queue_capacity));

    // Stand-in for the balance widget: refresh whenever a signal lands
    let mut subscription = bus.subscribe().await;
    let subscriber_id = subscription.id;
    let refresh_handle = tokio::spawn(async move {
        while let Some(signal) = subscription.recv().await {
            match signal.new_balance {
                Some(balance) => info!("Balance refreshed: {}", balance),
                None => info!("Balance changed, re-fetch required"),
            }
        }
    });

    let collaborators = Collaborators {
        toaster: Arc::new(LogToaster),
        bus: bus.clone(),
    };
    let channel = NotificationChannel::open(endpoint, config.user_id.clone(), collaborators);

    // Log every state transition
    let mut state = channel.watch();
    let state_handle = tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            match current {
                ConnectionState::Connected => info!("Notification channel connected"),
                ConnectionState::Disconnected => warn!("Notification channel disconnected"),
                other => info!("Notification channel {:?}", other),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down notification channel...");

    channel.close().await;
    bus.unsubscribe(subscriber_id).await;

    state_handle.abort();
    refresh_handle.abort();

    Ok(())
}
