use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::error::{BotError, Result};
use crate::scanner::{TrackedConflict, TrackedRetreat};
use crate::strategy::{DiscountPolicy, PricingPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    pub market: MarketConfig,
    pub tracking: TrackingConfig,
    pub discount: DiscountConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub base_url: String,
    pub operator_id: i64,
    pub auth_token: Option<String>,
    pub key_url: Option<String>,
    pub key_password: String,
    pub collections_limit: u32,
}

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub interval: Duration,
    pub startup_delay: Duration,
    /// Zero disables the periodic refresh pass.
    pub refresh_interval: Duration,
    pub pricing: PricingPolicy,
}

#[derive(Debug, Clone)]
pub struct DiscountConfig {
    pub policy: DiscountPolicy,
    pub scan_interval: Duration,
    pub collection_delay: Duration,
    pub on_tracked: TrackedConflict,
    pub on_tracked_retreat: TrackedRetreat,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub ttl: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    pub archive_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub health_port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parsed = |key: &str, default: u64| -> u64 {
            get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        };
        let nonzero = |key: &str, default: u64| -> Result<u64> {
            match parsed(key, default) {
                0 => Err(BotError::Config(format!("{} must be greater than zero", key))),
                value => Ok(value),
            }
        };
        let decimal = |key: &str, default: Decimal| -> Decimal {
            get(key)
                .and_then(|v| Decimal::from_str(v.trim()).ok())
                .unwrap_or(default)
        };

        let operator_id = get("USER_ID")
            .ok_or_else(|| BotError::Config("USER_ID is not set".to_string()))?
            .trim()
            .parse::<i64>()
            .map_err(|e| BotError::Config(format!("USER_ID is not an integer: {}", e)))?;

        let auth_token = get("PORTALS_AUTH_TOKEN");
        let key_url = get("PORTALS_KEY_URL");
        if auth_token.is_none() && key_url.is_none() {
            return Err(BotError::Config(
                "either PORTALS_AUTH_TOKEN or PORTALS_KEY_URL must be set".to_string(),
            ));
        }

        let need_diff_percent = required_positive(&get, "DISCOUNT_NEED_DIFF_PERCENT")?;
        let max_price = required_positive(&get, "DISCOUNT_MAX_PRICE")?;

        let on_tracked = match get("DISCOUNT_ON_TRACKED").as_deref().map(str::trim) {
            None | Some("abort") => TrackedConflict::AbortPass,
            Some("skip") => TrackedConflict::SkipCollection,
            Some(other) => {
                return Err(BotError::Config(format!(
                    "DISCOUNT_ON_TRACKED must be 'abort' or 'skip', got '{}'",
                    other
                )))
            }
        };

        let on_tracked_retreat = match get("DISCOUNT_RETREAT_TRACKED").as_deref().map(str::trim) {
            None | Some("retreat") => TrackedRetreat::Retreat,
            Some("leave") => TrackedRetreat::Leave,
            Some(other) => {
                return Err(BotError::Config(format!(
                    "DISCOUNT_RETREAT_TRACKED must be 'retreat' or 'leave', got '{}'",
                    other
                )))
            }
        };

        let tracking_interval = Duration::from_secs(nonzero("TRACKING_INTERVAL_SECS", 10)?);
        let scan_interval = Duration::from_secs(nonzero("DISCOUNT_SCAN_INTERVAL_MINS", 10)? * 60);

        let defaults = PricingPolicy::default();

        Ok(Config {
            market: MarketConfig {
                base_url: get("PORTALS_BASE_URL")
                    .unwrap_or_else(|| "https://portals-market.com".to_string()),
                operator_id,
                auth_token,
                key_url,
                key_password: get("PORTALS_KEY_PASSWORD").unwrap_or_default(),
                collections_limit: narrow("COLLECTIONS_LIMIT", parsed("COLLECTIONS_LIMIT", 200), 200),
            },
            tracking: TrackingConfig {
                interval: tracking_interval,
                startup_delay: Duration::from_millis(parsed("TRACKING_STARTUP_DELAY_MS", 1000)),
                refresh_interval: Duration::from_secs(parsed("TRACKING_REFRESH_MINS", 10) * 60),
                pricing: PricingPolicy {
                    include_commission: get("INCLUDE_COMMISSION")
                        .map(|v| matches!(v.trim(), "true" | "1"))
                        .unwrap_or(false),
                    commission_rate: decimal("COMMISSION_RATE", defaults.commission_rate),
                    price_step: decimal("PRICE_STEP", defaults.price_step),
                },
            },
            discount: DiscountConfig {
                policy: DiscountPolicy {
                    need_diff_percent,
                    max_price,
                },
                scan_interval,
                collection_delay: Duration::from_millis(parsed(
                    "DISCOUNT_COLLECTION_DELAY_MS",
                    1000,
                )),
                on_tracked,
                on_tracked_retreat,
            },
            cache: CacheConfig {
                path: PathBuf::from(
                    get("CACHE_PATH").unwrap_or_else(|| "collections.json".to_string()),
                ),
                ttl: Duration::from_secs(parsed("CACHE_TTL_SECS", 60)),
                retry_attempts: narrow(
                    "CACHE_RETRY_ATTEMPTS",
                    parsed("CACHE_RETRY_ATTEMPTS", 10).max(1),
                    10,
                ),
                retry_delay: Duration::from_millis(parsed("CACHE_RETRY_DELAY_MS", 1000)),
            },
            storage: StorageConfig {
                database_url: get("DATABASE_URL")
                    .unwrap_or_else(|| "sqlite://data/collections.db".to_string()),
                archive_dir: PathBuf::from(
                    get("ARCHIVE_DIR").unwrap_or_else(|| "archive".to_string()),
                ),
            },
            notify: NotifyConfig {
                webhook_url: get("NOTIFY_WEBHOOK_URL"),
                telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
                telegram_chat_id: get("TELEGRAM_CHAT_ID").and_then(|v| v.trim().parse().ok()),
            },
            monitoring: MonitoringConfig {
                health_port: narrow("HEALTH_PORT", parsed("HEALTH_PORT", 3000), 3000),
                log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            },
        })
    }
}

/// Out-of-range values fall back to the default instead of wrapping.
fn narrow<T: TryFrom<u64>>(key: &str, value: u64, default: T) -> T {
    T::try_from(value).unwrap_or_else(|_| {
        tracing::warn!("{}={} is out of range, using the default", key, value);
        default
    })
}

fn required_positive<G>(get: &G, key: &str) -> Result<Decimal>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key).ok_or_else(|| BotError::Config(format!("{} is not set", key)))?;
    let value = Decimal::from_str(raw.trim())
        .map_err(|e| BotError::Config(format!("{} is not a number: {}", key, e)))?;

    if value <= Decimal::ZERO {
        return Err(BotError::Config(format!("{} must be positive", key)));
    }

    Ok(value)
}
