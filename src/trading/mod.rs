pub mod tracker;

pub use tracker::{teardown_effects, Effect, ReconcileOutcome, TrackerSettings, TrackingScheduler};
