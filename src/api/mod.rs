pub mod credentials;
pub mod portals;
pub mod types;

pub use credentials::{CredentialProvider, RemoteCredentialProvider, StaticCredentialProvider};
pub use portals::{MarketplaceTransport, PortalsClient};
pub use types::*;
