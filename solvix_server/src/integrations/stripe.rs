//! Stripe card payments over the REST API.
//!
//! Two things happen here: payment intents are created when a customer checks out, and Stripe's webhook events are
//! verified and turned into engine [`PaymentReport`]s.
use std::{collections::HashMap, sync::Arc};

use hmac::{Hmac, Mac};
use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use solvix_common::{Cents, Secret, STORE_CURRENCY_CODE};
use solvix_engine::{
    db_types::{PaymentOutcome, CARD_PROVIDER},
    payment_objects::PaymentReport,
};
use thiserror::Error;

use crate::config::StripeConfig;

pub const PAYMENT_SUCCEEDED_EVENT: &str = "payment_intent.succeeded";
pub const PAYMENT_FAILED_EVENT: &str = "payment_intent.payment_failed";

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Could not reach the payment provider. {0}")]
    RequestFailed(String),
    #[error("The payment provider sent an unexpected response. {0}")]
    InvalidResponse(String),
    #[error("Card payments are not configured. {0}")]
    NotConfigured(String),
    #[error("Webhook Error: {0}")]
    InvalidSignature(String),
}

/// The parts of a Stripe payment intent that we care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub receipt_email: Option<String>,
}

/// Creates payment intents with a card payment provider.
#[allow(async_fn_in_trait)]
pub trait CardPaymentProvider {
    /// Opens a payment intent for `amount`. `metadata` is echoed back by the provider in its webhook events.
    async fn create_payment_intent(
        &self,
        amount: Cents,
        metadata: &[(String, String)],
    ) -> Result<PaymentIntent, ProviderError>;
}

#[derive(Clone)]
pub struct StripeClient {
    client: Arc<Client>,
    api_url: String,
    secret_key: Secret<String>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().build().map_err(|e| ProviderError::NotConfigured(e.to_string()))?;
        let api_url = config.api_url.trim_end_matches('/').to_string();
        Ok(Self { client: Arc::new(client), api_url, secret_key: config.secret_key.clone() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.api_url)
    }
}

impl CardPaymentProvider for StripeClient {
    async fn create_payment_intent(
        &self,
        amount: Cents,
        metadata: &[(String, String)],
    ) -> Result<PaymentIntent, ProviderError> {
        if !self.secret_key.is_set() {
            return Err(ProviderError::NotConfigured("SOLVIX_STRIPE_SECRET_KEY is not set".into()));
        }
        let mut form = vec![
            ("amount".to_string(), amount.value().to_string()),
            ("currency".to_string(), STORE_CURRENCY_CODE.to_lowercase()),
        ];
        form.extend(metadata.iter().map(|(k, v)| (format!("metadata[{k}]"), v.clone())));
        trace!("💳️ Creating payment intent for {amount}");
        let response = self
            .client
            .post(self.url("/payment_intents"))
            .basic_auth(self.secret_key.reveal(), None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        if response.status().is_success() {
            let intent =
                response.json::<PaymentIntent>().await.map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            debug!("💳️ Payment intent {} created for {amount}", intent.id);
            Ok(intent)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or(body);
            warn!("💳️ Stripe refused to create a payment intent ({status}). {message}");
            Err(ProviderError::RequestFailed(format!("Stripe returned {status}. {message}")))
        }
    }
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

impl StripeEvent {
    /// Converts a payment intent event into a report for the engine. Event types that do not describe a payment
    /// outcome give `Ok(None)`.
    pub fn payment_report(&self) -> Result<Option<PaymentReport>, ProviderError> {
        let outcome = match self.event_type.as_str() {
            PAYMENT_SUCCEEDED_EVENT => PaymentOutcome::Succeeded,
            PAYMENT_FAILED_EVENT => PaymentOutcome::Failed,
            _ => return Ok(None),
        };
        let intent = serde_json::from_value::<PaymentIntent>(self.data.object.clone())
            .map_err(|e| ProviderError::InvalidResponse(format!("Event {} is not a payment intent. {e}", self.id)))?;
        let mut report = PaymentReport::new(CARD_PROVIDER, intent.id.as_str(), outcome)
            .with_amount(Cents::from(intent.amount))
            .with_metadata(serde_json::json!({ "stripeEventId": self.id, "stripeStatus": intent.status }));
        match intent.metadata.get("orderId").map(|s| s.parse::<i64>()) {
            Some(Ok(order_id)) => report = report.with_order_id(order_id),
            Some(Err(e)) => warn!("💳️ Payment intent {} has an invalid orderId in its metadata. {e}", intent.id),
            None => debug!("💳️ Payment intent {} carries no orderId", intent.id),
        }
        if let Some(email) = intent.receipt_email {
            report = report.with_customer_email(email);
        }
        Ok(Some(report))
    }
}

/// Checks a `Stripe-Signature` header (`t=<unix time>,v1=<hex hmac>`) against the raw request body.
///
/// The signature is an HMAC-SHA256 of `"<t>.<body>"` keyed with the webhook signing secret. Any of several `v1`
/// entries may match, which is how Stripe signs during secret rotation. Events older (or newer) than `tolerance`
/// seconds are rejected.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    tolerance: i64,
    now: i64,
) -> Result<(), ProviderError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in sig_header.split(',').map(str::trim) {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }
    let timestamp = timestamp.ok_or_else(|| ProviderError::InvalidSignature("No timestamp in signature".into()))?;
    if signatures.is_empty() {
        return Err(ProviderError::InvalidSignature("No v1 signature found".into()));
    }
    let ts = timestamp.parse::<i64>().map_err(|_| ProviderError::InvalidSignature("Invalid timestamp".into()))?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ProviderError::InvalidSignature(format!("Unusable signing secret. {e}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let valid = signatures
        .iter()
        .filter_map(|sig| hex::decode(sig).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok());
    if !valid {
        return Err(ProviderError::InvalidSignature("Signature mismatch".into()));
    }
    if (now - ts).abs() > tolerance {
        return Err(ProviderError::InvalidSignature("Timestamp outside the tolerance zone".into()));
    }
    Ok(())
}

/// Produces a `Stripe-Signature` header value for `payload`. Stripe does this on their side; we use it in tests.
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!("💳️ Could not create webhook signer. {e}");
            return format!("t={timestamp}");
        },
    };
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
