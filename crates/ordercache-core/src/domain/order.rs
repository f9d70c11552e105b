//! Order aggregate.
//!
//! The JSON field names are the producer's wire format and must not change:
//! events on the bus and responses from the HTTP facade share them.

use crate::{OrderError, OrderResult};
use serde::{Deserialize, Deserializer, Serialize};

/// Order aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Order {
    /// Producer-supplied business identifier.
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    /// Line items in producer order. Duplicate `chrt_id`s are allowed.
    /// Producers may send `null` or omit the key for an empty list.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    /// Creation timestamp exactly as the producer encoded it.
    pub date_created: String,
    pub oof_shard: String,
}

/// Delivery details, owned 1:1 by an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment details, owned 1:1 by an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    /// Unix seconds.
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

/// A single order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    /// Sale percentage.
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Item>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Item>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Order {
    /// Decodes an order event payload.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Decode`] if the payload is not a complete order.
    pub fn decode(payload: &[u8]) -> OrderResult<Self> {
        serde_json::from_slice(payload).map_err(OrderError::from)
    }

    /// Encodes the order in its wire format.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Internal`] if serialization fails.
    pub fn encode(&self) -> OrderResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| OrderError::internal(format!("Failed to encode order: {}", e)))
    }

    /// Number of line items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
