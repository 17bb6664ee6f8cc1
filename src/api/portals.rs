use async_trait::async_trait;
use reqwest::{header, Client, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use super::types::*;
use crate::core::{BotError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";

/// The remote operations the controller needs from the marketplace.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketplaceTransport: Send + Sync {
    async fn list_offers(&self, token: &str, collection_id: &str) -> Result<Vec<Offer>>;

    /// `Ok(None)` means the server answered with an empty body.
    async fn update_offer_price(
        &self,
        token: &str,
        offer_id: &str,
        price: Decimal,
    ) -> Result<Option<serde_json::Value>>;

    async fn list_collections(&self, token: &str, limit: u32) -> Result<CollectionList>;
}

pub struct PortalsClient {
    client: Client,
    base_url: String,
}

impl PortalsClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn http_client() -> Result<Client> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/plain, */*"),
        );

        Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(BotError::transport)
    }

    async fn checked(response: Response) -> Result<Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Marketplace API error: {} - {}", status, error_text);
            return Err(BotError::Transport(format!(
                "request failed: {} - {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &str, endpoint: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, token)
            .send()
            .await
            .map_err(BotError::transport)?;

        Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|e| BotError::Transport(format!("malformed body from {}: {}", endpoint, e)))
    }
}

#[async_trait]
impl MarketplaceTransport for PortalsClient {
    async fn list_offers(&self, token: &str, collection_id: &str) -> Result<Vec<Offer>> {
        let endpoint = format!("/api/collection-offers/{}/all", collection_id);
        self.get_json(token, &endpoint).await
    }

    async fn update_offer_price(
        &self,
        token: &str,
        offer_id: &str,
        price: Decimal,
    ) -> Result<Option<serde_json::Value>> {
        let url = format!("{}/api/collection-offers/update", self.base_url);
        let body = UpdateOfferRequest {
            amount: price,
            id: offer_id.to_string(),
            max_nfts: 1,
        };

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, token)
            .header(header::ORIGIN, self.base_url.as_str())
            .json(&body)
            .send()
            .await
            .map_err(BotError::transport)?;

        let text = Self::checked(response)
            .await?
            .text()
            .await
            .map_err(BotError::transport)?;

        parse_update_body(&text)
    }

    async fn list_collections(&self, token: &str, limit: u32) -> Result<CollectionList> {
        let endpoint = format!("/api/collections?limit={}", limit);
        self.get_json(token, &endpoint).await
    }
}

fn parse_update_body(text: &str) -> Result<Option<serde_json::Value>> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| BotError::Parse(format!("{} (body: {})", e, text)))
}
