pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod shutdown;

pub use config::Config;
pub use error::{BotError, Result};
pub use health::{Component, HealthChecker};
