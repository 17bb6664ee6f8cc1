use async_trait::async_trait;
use reqwest::Client;

use super::types::TokenResponse;
use crate::core::{BotError, Result};

/// Supplies the bearer token attached to every marketplace call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_token(&self) -> Result<String>;
}

pub struct StaticCredentialProvider {
    token: String,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn get_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Fetches a fresh key from the credential service on every call.
pub struct RemoteCredentialProvider {
    client: Client,
    key_url: String,
    password: String,
}

impl RemoteCredentialProvider {
    pub fn new(client: Client, key_url: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client,
            key_url: key_url.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for RemoteCredentialProvider {
    async fn get_token(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.key_url)
            .query(&[("password", self.password.as_str())])
            .send()
            .await
            .map_err(BotError::auth)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Auth(format!("credential service returned {}", status)));
        }

        let body: TokenResponse = response.json().await.map_err(BotError::auth)?;

        Ok(format!("tma {}", body.data))
    }
}
