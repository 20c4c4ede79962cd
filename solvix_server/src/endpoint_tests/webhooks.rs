use actix_web::{http::StatusCode, test::TestRequest};
use chrono::Utc;
use serde_json::json;
use solvix_common::Cents;
use solvix_engine::{
    db_types::{NewOrder, NewPayment, Order, OrderStatusType, PaymentState, PaymentStatus},
    OrderLifecycleDatabase,
    OrderQueries,
};

use super::{
    helpers::{json, request, Fixture, TEST_WEBHOOK_SECRET},
    mocks::MockCardProvider,
};
use crate::{integrations::stripe::sign_webhook_payload, middleware::STRIPE_SIGNATURE_HEADER};

const INTENT_ID: &str = "pi_webhook_1";

/// An order with a pending card payment, as left behind by a checkout.
async fn checkout(fixture: &Fixture) -> Order {
    let new_order = NewOrder::new(fixture.customer.id, fixture.service.id, Cents::from(49_900));
    let order = fixture.db.insert_order_with_admin_notices(new_order).await.unwrap();
    let payment = NewPayment::card(&order, INTENT_ID, json!({})).with_customer_email("customer@solvix.test");
    fixture.db.insert_payment(payment).await.unwrap();
    order
}

fn intent_event(event_type: &str, intent_id: &str, order_id: i64) -> Vec<u8> {
    let event = json!({
        "id": format!("evt_{event_type}"),
        "object": "event",
        "type": event_type,
        "data": { "object": {
            "id": intent_id,
            "object": "payment_intent",
            "amount": 49_900,
            "client_secret": format!("{intent_id}_secret"),
            "status": "succeeded",
            "metadata": { "orderId": order_id.to_string() }
        }}
    });
    serde_json::to_vec(&event).unwrap()
}

fn signed(body: Vec<u8>) -> TestRequest {
    let signature = sign_webhook_payload(&body, TEST_WEBHOOK_SECRET, Utc::now().timestamp());
    TestRequest::post()
        .uri("/api/webhooks/stripe")
        .insert_header((STRIPE_SIGNATURE_HEADER, signature))
        .set_payload(body)
}

#[actix_web::test]
async fn succeeded_event_confirms_payment() {
    let fixture = Fixture::new().await;
    let order = checkout(&fixture).await;
    let body = intent_event("payment_intent.succeeded", INTENT_ID, order.id);
    let (status, response) = request(&fixture, MockCardProvider::new(), signed(body.clone())).await;
    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(json(&response), json!({ "received": true }));

    let order = fixture.db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Confirmed);
    assert_eq!(order.status, OrderStatusType::Pending);
    let payment = fixture.db.fetch_latest_payment(&order.id.to_string()).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Confirmed);

    // Stripe delivers at least once. A replay changes nothing.
    let (status, _) = request(&fixture, MockCardProvider::new(), signed(body)).await;
    assert_eq!(status, StatusCode::OK);
    let payments = fixture.db.fetch_payments_for_order(order.id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Confirmed);
}

#[actix_web::test]
async fn failed_event_marks_payment_failed() {
    let fixture = Fixture::new().await;
    let order = checkout(&fixture).await;
    let body = intent_event("payment_intent.payment_failed", INTENT_ID, order.id);
    let (status, _) = request(&fixture, MockCardProvider::new(), signed(body)).await;
    assert_eq!(status, StatusCode::OK);
    let order = fixture.db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Failed);

    let req = TestRequest::get().uri(&format!("/api/payments/{}/status", order.id));
    let (_, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(json(&body)["status"], "failed");
}

#[actix_web::test]
async fn bad_signatures_are_rejected() {
    let fixture = Fixture::new().await;
    let order = checkout(&fixture).await;
    let body = intent_event("payment_intent.succeeded", INTENT_ID, order.id);

    let forged = sign_webhook_payload(&body, "whsec_someone_else", Utc::now().timestamp());
    let req = TestRequest::post()
        .uri("/api/webhooks/stripe")
        .insert_header((STRIPE_SIGNATURE_HEADER, forged))
        .set_payload(body.clone());
    let (status, response) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.contains("Webhook Error"), "{response}");

    let stale = sign_webhook_payload(&body, TEST_WEBHOOK_SECRET, Utc::now().timestamp() - 3600);
    let req = TestRequest::post()
        .uri("/api/webhooks/stripe")
        .insert_header((STRIPE_SIGNATURE_HEADER, stale))
        .set_payload(body.clone());
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post().uri("/api/webhooks/stripe").set_payload(body);
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let order = fixture.db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Unverified);
}

#[actix_web::test]
async fn unmatched_and_unrelated_events_are_acknowledged() {
    let fixture = Fixture::new().await;
    let body = intent_event("payment_intent.succeeded", "pi_unknown", 9_999);
    let (status, response) = request(&fixture, MockCardProvider::new(), signed(body)).await;
    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(json(&response)["received"], true);

    let body = serde_json::to_vec(&json!({
        "id": "evt_customer",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    }))
    .unwrap();
    let (status, _) = request(&fixture, MockCardProvider::new(), signed(body)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&fixture, MockCardProvider::new(), signed(b"not json".to_vec())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
