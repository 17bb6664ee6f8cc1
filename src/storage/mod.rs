pub mod archive;
pub mod registry;

pub use archive::OfferArchive;
pub use registry::{CollectionRegistry, SqliteCollectionRegistry};
