use anyhow::{Context, Result};
use offer_sync_bot::api::{
    CredentialProvider, PortalsClient, RemoteCredentialProvider, StaticCredentialProvider,
};
use offer_sync_bot::core::{logging, shutdown, Component, Config, HealthChecker};
use offer_sync_bot::market::{CollectionCache, OfferFeed, RetryPolicy};
use offer_sync_bot::notify::{
    FanoutNotifier, LogNotifier, NotificationGate, Notifier, TelegramNotifier, WebhookNotifier,
};
use offer_sync_bot::scanner::{DiscountScanner, ScannerSettings};
use offer_sync_bot::storage::{CollectionRegistry, OfferArchive, SqliteCollectionRegistry};
use offer_sync_bot::trading::{TrackerSettings, TrackingScheduler};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env().context("invalid configuration")?;

    // Initialize logging
    logging::init_logging(&config.monitoring.log_level);

    tracing::info!("🚀 Offer sync bot starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Operator: {}", config.market.operator_id);

    let health_checker = HealthChecker::new();

    let health_clone = health_checker.clone();
    let health_port = config.monitoring.health_port;
    tokio::spawn(async move { start_health_server(health_clone, health_port).await });
    tracing::info!("✅ Health endpoint running on port {}", health_port);

    let client = PortalsClient::http_client().context("failed to build HTTP client")?;

    let credentials: Arc<dyn CredentialProvider> = match (
        &config.market.auth_token,
        &config.market.key_url,
    ) {
        (Some(token), _) => Arc::new(StaticCredentialProvider::new(token.clone())),
        (None, Some(key_url)) => Arc::new(RemoteCredentialProvider::new(
            client.clone(),
            key_url.clone(),
            config.market.key_password.clone(),
        )),
        (None, None) => anyhow::bail!("no marketplace credentials configured"),
    };

    let transport = Arc::new(PortalsClient::new(client.clone(), &config.market.base_url));
    let feed = Arc::new(OfferFeed::new(credentials, transport));

    let cache = Arc::new(CollectionCache::new(
        feed.clone(),
        &config.cache.path,
        config.cache.ttl,
        RetryPolicy {
            attempts: config.cache.retry_attempts,
            delay: config.cache.retry_delay,
        },
        config.market.collections_limit,
    ));

    let registry: Arc<dyn CollectionRegistry> = Arc::new(
        SqliteCollectionRegistry::connect(&config.storage.database_url)
            .await
            .with_context(|| {
                format!("failed to open registry {}", config.storage.database_url)
            })?,
    );
    health_checker.report(Component::Registry, true).await;

    let notifier = build_notifier(&config, &client);
    health_checker.report(Component::Notifier, true).await;

    let tracker = Arc::new(TrackingScheduler::new(
        feed.clone(),
        OfferArchive::new(&config.storage.archive_dir),
        notifier.clone(),
        health_checker.clone(),
        TrackerSettings {
            operator_id: config.market.operator_id,
            interval: config.tracking.interval,
            startup_delay: config.tracking.startup_delay,
            refresh_interval: config.tracking.refresh_interval,
            pricing: config.tracking.pricing.clone(),
        },
    ));

    let scanner = Arc::new(DiscountScanner::new(
        feed,
        cache.clone(),
        tracker.clone(),
        Arc::new(NotificationGate::new(notifier)),
        ScannerSettings {
            operator_id: config.market.operator_id,
            policy: config.discount.policy.clone(),
            price_step: config.tracking.pricing.price_step,
            interval: config.discount.scan_interval,
            collection_delay: config.discount.collection_delay,
            on_tracked: config.discount.on_tracked,
            on_tracked_retreat: config.discount.on_tracked_retreat,
        },
    ));

    let mut signals =
        shutdown::ShutdownSignal::install().context("failed to listen for shutdown signals")?;

    let tracking = tracker.clone().start(registry, cache);
    let scanning = scanner.start();

    tracing::info!("✅ Tracking and discount scanning started");

    let received = signals.recv().await;
    tracing::info!("🛑 {} received, shutting down...", received);
    tracking.abort();
    scanning.abort();
    tracker.shutdown().await;

    Ok(())
}

fn build_notifier(config: &Config, client: &reqwest::Client) -> Arc<dyn Notifier> {
    let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

    if let Some(url) = &config.notify.webhook_url {
        channels.push(Box::new(WebhookNotifier::new(client.clone(), url.clone())));
    }

    match (&config.notify.telegram_bot_token, config.notify.telegram_chat_id) {
        (Some(token), Some(chat_id)) => {
            channels.push(Box::new(TelegramNotifier::new(
                client.clone(),
                token.clone(),
                chat_id,
            )));
        }
        (Some(_), None) => tracing::warn!("TELEGRAM_CHAT_ID missing, Telegram disabled"),
        _ => {}
    }

    if channels.is_empty() {
        tracing::info!("No notification channel configured, logging alerts only");
        return Arc::new(LogNotifier);
    }

    Arc::new(FanoutNotifier::new(channels))
}

async fn start_health_server(health_checker: HealthChecker, port: u16) {
    use warp::Filter;

    let health = warp::path("health")
        .and(warp::any().map(move || health_checker.clone()))
        .and_then(|checker: HealthChecker| async move {
            let status = checker.get_status().await;
            Ok::<_, warp::Rejection>(warp::reply::json(&status))
        });

    warp::serve(health).run(([0, 0, 0, 0], port)).await;
}
