use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub floor_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub sender_id: i64,
    pub amount: Decimal,
    pub collection: Collection,
    /// Wire fields this crate does not model, kept for archival.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionList {
    pub collections: Vec<Collection>,
}

impl CollectionList {
    pub fn ids(&self) -> Vec<String> {
        self.collections.iter().map(|c| c.id.clone()).collect()
    }

    pub fn name_of(&self, collection_id: &str) -> Option<&str> {
        self.collections
            .iter()
            .find(|c| c.id == collection_id)
            .map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateOfferRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub id: String,
    pub max_nfts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_offer_accepts_string_and_number_amounts() {
        let raw = r#"[
            {"id": "a", "sender_id": 1, "amount": "12.50", "collection": {"floor_price": "20"}},
            {"id": "b", "sender_id": 2, "amount": 11.3, "collection": {"floor_price": 20}, "max_nfts": 1}
        ]"#;

        let offers: Vec<Offer> = serde_json::from_str(raw).unwrap();
        assert_eq!(offers[0].amount, dec!(12.50));
        assert_eq!(offers[1].amount, dec!(11.3));
        assert_eq!(offers[1].collection.floor_price, dec!(20));
        assert_eq!(offers[1].extra.get("max_nfts"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_update_request_sends_numeric_amount() {
        let body = serde_json::to_value(UpdateOfferRequest {
            amount: dec!(95.01),
            id: "offer-1".to_string(),
            max_nfts: 1,
        })
        .unwrap();

        assert_eq!(body["amount"], serde_json::json!(95.01));
        assert_eq!(body["id"], "offer-1");
    }

    #[test]
    fn test_collection_list_lookup() {
        let list: CollectionList = serde_json::from_str(
            r#"{"collections": [{"id": "c1", "name": "Plush Pepe", "floor_price": "50"}]}"#,
        )
        .unwrap();

        assert_eq!(list.ids(), vec!["c1".to_string()]);
        assert_eq!(list.name_of("c1"), Some("Plush Pepe"));
        assert_eq!(list.name_of("c2"), None);
    }
}
