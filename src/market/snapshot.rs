use rust_decimal::Decimal;
use std::sync::Arc;

use crate::api::{CollectionList, CredentialProvider, MarketplaceTransport, Offer};
use crate::core::{BotError, Result};
use crate::strategy::round_price;

/// Point-in-time read of every offer in one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferSnapshot {
    pub collection_id: String,
    pub offers: Vec<Offer>,
}

impl OfferSnapshot {
    pub fn new(collection_id: impl Into<String>, offers: Vec<Offer>) -> Self {
        Self {
            collection_id: collection_id.into(),
            offers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn own_offer(&self, operator_id: i64) -> Option<&Offer> {
        self.offers.iter().find(|o| o.sender_id == operator_id)
    }

    pub fn competitors(&self, operator_id: i64) -> impl Iterator<Item = &Offer> {
        self.offers.iter().filter(move |o| o.sender_id != operator_id)
    }

    /// Highest competing amount, rounded to cents. `None` when nobody else bids.
    pub fn max_competitor_amount(&self, operator_id: i64) -> Option<Decimal> {
        self.competitors(operator_id)
            .map(|o| round_price(o.amount))
            .max()
    }

    /// Floor price as reported on the first offer's collection.
    pub fn floor_price(&self) -> Option<Decimal> {
        self.offers.first().map(|o| o.collection.floor_price)
    }
}

/// The only read path into the marketplace plus the price update write path.
/// Does not retry; callers own their retry policy.
pub struct OfferFeed {
    credentials: Arc<dyn CredentialProvider>,
    transport: Arc<dyn MarketplaceTransport>,
}

impl OfferFeed {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        transport: Arc<dyn MarketplaceTransport>,
    ) -> Self {
        Self {
            credentials,
            transport,
        }
    }

    pub async fn fetch_offers(&self, collection_id: &str) -> Result<OfferSnapshot> {
        let token = self.credentials.get_token().await?;
        let offers = self.transport.list_offers(&token, collection_id).await?;

        tracing::debug!("Fetched {} offers for collection {}", offers.len(), collection_id);

        Ok(OfferSnapshot::new(collection_id, offers))
    }

    /// Submits a new price. A malformed response body is logged and treated as no result.
    pub async fn submit_price(
        &self,
        offer_id: &str,
        price: Decimal,
    ) -> Result<Option<serde_json::Value>> {
        let token = self.credentials.get_token().await?;

        match self.transport.update_offer_price(&token, offer_id, price).await {
            Ok(None) => {
                tracing::debug!("Empty response for offer {} price update", offer_id);
                Ok(None)
            }
            Ok(Some(body)) => Ok(Some(body)),
            Err(BotError::Parse(e)) => {
                tracing::warn!("Unreadable response for offer {} price update: {}", offer_id, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_collections(&self, limit: u32) -> Result<CollectionList> {
        let token = self.credentials.get_token().await?;
        self.transport.list_collections(&token, limit).await
    }
}
