use serde::{Deserialize, Serialize};
use solvix_common::Cents;

use crate::db_types::PaymentOutcome;

/// A payment result delivered by a payment provider (typically via a webhook).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReport {
    /// Provider discriminator, e.g. `stripe`.
    pub provider: String,
    /// The provider's reference for the payment, e.g. a payment intent id.
    pub provider_order_id: String,
    /// The internal order id, as carried in the provider's payment metadata.
    pub order_id: Option<i64>,
    pub outcome: PaymentOutcome,
    pub amount: Option<Cents>,
    pub customer_email: Option<String>,
    pub metadata: serde_json::Value,
}

impl PaymentReport {
    pub fn new<S: Into<String>, R: Into<String>>(provider: S, provider_order_id: R, outcome: PaymentOutcome) -> Self {
        Self {
            provider: provider.into(),
            provider_order_id: provider_order_id.into(),
            order_id: None,
            outcome,
            amount: None,
            customer_email: None,
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_order_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_amount(mut self, amount: Cents) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_customer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A customer's claim that they sent a crypto payment. The claim is recorded, not verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoClaim {
    pub transaction_hash: String,
    /// Currency symbol: `BTC`, `ETH` or `USDT`.
    pub method: String,
    /// Amount in whole currency units (dollars), as entered by the customer.
    pub amount: f64,
    #[serde(default)]
    pub customer_email: Option<String>,
}
