//! Shopping cart service
//!
//! Applies the storage migrations and relays shop notifications from the
//! event bus to the log until interrupted.
//! Reads configuration from TOML (~/.config/shoppingcart/config.toml).

use tracing::{error, info};

use shoppingcart::config::AppConfig;
use shoppingcart::notifications::EventSubscriber;
use shoppingcart::telemetry::init_logging;
use shoppingcart::{connect_repositories, create_event_bus, DatabaseConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let (app_cfg, load_error) = match AppConfig::load_default() {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    init_logging(&app_cfg.logging);
    if let Some(e) = load_error {
        error!("Failed to load config: {}. Using defaults.", e);
    }
    info!("Starting shopping cart service ({})", app_cfg.shop.platform_name);

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig::from(&app_cfg.database);
    if let Err(e) = connect_repositories(&db_config).await {
        error!("Failed to prepare storage: {}", e);
        return Err(e.into());
    }
    info!("Storage ready");

    // ── Notifications ──────────────────────────────────────────
    let event_bus = create_event_bus();
    let relay = tokio::spawn(relay_notifications(event_bus.subscribe()));
    info!("Notification relay running");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    relay.abort();
    Ok(())
}

async fn relay_notifications(mut subscriber: EventSubscriber) {
    while let Some(message) = subscriber.recv().await {
        let notification = message.event.notification();
        for recipient in message.event.recipients() {
            info!(
                event_id = %message.id,
                kind = message.event.event_type(),
                to = recipient.email.as_deref().unwrap_or("-"),
                subject = %notification.subject,
                "Notification queued for delivery"
            );
        }
    }
}
