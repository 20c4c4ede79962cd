use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use solvix_common::Cents;
use solvix_engine::{db_types::PaymentStatus, OrderQueries};

use super::{
    helpers::{bearer, json, request, Fixture},
    mocks::{intent_for, MockCardProvider},
};
use crate::integrations::stripe::ProviderError;

fn checkout_body(fixture: &Fixture) -> serde_json::Value {
    json!({ "amount": 49_900, "items": [{ "id": fixture.service.id, "name": "Landing page" }] })
}

#[actix_web::test]
async fn checkout_creates_order_intent_and_pending_payment() {
    let fixture = Fixture::new().await;
    let mut provider = MockCardProvider::new();
    provider
        .expect_create_payment_intent()
        .times(1)
        .returning(|amount: Cents, metadata: &[(String, String)]| Ok(intent_for("pi_checkout_1", amount, metadata)));
    let req = TestRequest::post()
        .uri("/api/payments/create-intent")
        .insert_header(bearer(&fixture.customer_token()))
        .set_json(checkout_body(&fixture));
    let (status, body) = request(&fixture, provider, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let body = json(&body);
    assert_eq!(body["clientSecret"], "pi_checkout_1_secret_abc");
    let order_id = body["orderId"].as_i64().unwrap();

    let order = fixture.db.fetch_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.user_id, fixture.customer.id);
    assert_eq!(order.service_id, fixture.service.id);
    assert_eq!(order.total_price, Cents::from(49_900));

    let payments = fixture.db.fetch_payments_for_order(order_id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Pending);
    assert_eq!(payments[0].provider_order_id, "pi_checkout_1");
    assert_eq!(payments[0].customer_email.as_deref(), Some("customer@solvix.test"));

    let req = TestRequest::get().uri(&format!("/api/payments/{order_id}/status"));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["orderId"], order_id.to_string());
}

#[actix_web::test]
async fn intent_metadata_carries_the_order_id() {
    let fixture = Fixture::new().await;
    let mut provider = MockCardProvider::new();
    provider.expect_create_payment_intent().times(1).returning(|amount: Cents, metadata: &[(String, String)]| {
        let order_id = metadata.iter().find(|(k, _)| k == "orderId").map(|(_, v)| v.clone());
        let items = metadata.iter().find(|(k, _)| k == "items").map(|(_, v)| v.clone());
        assert!(order_id.is_some_and(|id| id.parse::<i64>().is_ok()));
        assert!(items.is_some_and(|s| s.contains("Landing page")));
        Ok(intent_for("pi_checkout_2", amount, metadata))
    });
    let req = TestRequest::post()
        .uri("/api/payments/create-intent")
        .insert_header(bearer(&fixture.customer_token()))
        .set_json(checkout_body(&fixture));
    let (status, body) = request(&fixture, provider, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[actix_web::test]
async fn checkout_failures() {
    let fixture = Fixture::new().await;
    let token = fixture.customer_token();
    // Empty carts never reach the provider
    let req = TestRequest::post()
        .uri("/api/payments/create-intent")
        .insert_header(bearer(&token))
        .set_json(json!({ "amount": 100, "items": [] }));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "At least one item is required");

    let mut provider = MockCardProvider::new();
    provider
        .expect_create_payment_intent()
        .returning(|_: Cents, _: &[(String, String)]| Err(ProviderError::RequestFailed("connection refused".into())));
    let req = TestRequest::post()
        .uri("/api/payments/create-intent")
        .insert_header(bearer(&token))
        .set_json(checkout_body(&fixture));
    let (status, _) = request(&fixture, provider, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let req = TestRequest::post().uri("/api/payments/create-intent").set_json(checkout_body(&fixture));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn crypto_claims_are_always_pending() {
    let fixture = Fixture::new().await;
    let token = fixture.customer_token();
    let claim = json!({ "transactionHash": "0xfeedbeef", "method": "ETH", "amount": 499.0 });
    let req = TestRequest::post().uri("/api/payments/verify").insert_header(bearer(&token)).set_json(claim);
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body), json!({ "message": "Payment verification submitted", "status": "pending" }));

    let claim = json!({ "transactionHash": "0xfeedbeef", "method": "DOGE", "amount": 499.0 });
    let req = TestRequest::post().uri("/api/payments/verify").insert_header(bearer(&token)).set_json(claim);
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_payments_are_not_found() {
    let fixture = Fixture::new().await;
    let req = TestRequest::get().uri("/api/payments/31337/status");
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "Payment not found");
}
