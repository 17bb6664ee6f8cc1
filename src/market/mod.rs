pub mod collection_cache;
pub mod snapshot;

pub use collection_cache::{CollectionCache, RetryPolicy};
pub use snapshot::{OfferFeed, OfferSnapshot};
