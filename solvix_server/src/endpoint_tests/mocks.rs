use mockall::mock;
use solvix_common::Cents;

use crate::integrations::stripe::{CardPaymentProvider, PaymentIntent, ProviderError};

mock! {
    pub CardProvider {}
    impl CardPaymentProvider for CardProvider {
        async fn create_payment_intent(&self, amount: Cents, metadata: &[(String, String)]) -> Result<PaymentIntent, ProviderError>;
    }
}

/// An intent as Stripe would return it for a freshly created checkout.
pub fn intent_for(id: &str, amount: Cents, metadata: &[(String, String)]) -> PaymentIntent {
    PaymentIntent {
        id: id.to_string(),
        client_secret: Some(format!("{id}_secret_abc")),
        amount: amount.value(),
        status: "requires_payment_method".into(),
        metadata: metadata.iter().cloned().collect(),
        receipt_email: None,
    }
}
