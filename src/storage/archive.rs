use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::api::Offer;
use crate::core::Result;

/// One JSON file per lost offer, named by creation time.
pub struct OfferArchive {
    dir: PathBuf,
}

impl OfferArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, offer: &Offer) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let millis = Utc::now().timestamp_millis();
        let mut path = self.dir.join(format!("last_offer_{}.json", millis));
        let mut suffix = 1;
        while tokio::fs::try_exists(&path).await.unwrap_or(false) {
            path = self.dir.join(format!("last_offer_{}_{}.json", millis, suffix));
            suffix += 1;
        }

        tokio::fs::write(&path, serde_json::to_vec_pretty(offer)?).await?;

        tracing::info!("🗄️  Archived offer {} to {}", offer.id, path.display());

        Ok(path)
    }
}
