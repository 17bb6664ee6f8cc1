pub mod dedup;
pub mod notifier;

pub use dedup::NotificationGate;
pub use notifier::{FanoutNotifier, LogNotifier, Notifier, TelegramNotifier, WebhookNotifier};
