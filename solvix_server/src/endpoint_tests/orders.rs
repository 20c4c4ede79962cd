use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};
use solvix_engine::test_utils::prepare_env::seed_user;

use super::{
    helpers::{bearer, issue_token, json, request, Fixture},
    mocks::MockCardProvider,
};

async fn place_order(fixture: &Fixture, token: &str, body: Value) -> (StatusCode, Value) {
    let req = TestRequest::post().uri("/api/orders").insert_header(bearer(token)).set_json(body);
    let (status, body) = request(fixture, MockCardProvider::new(), req).await;
    (status, json(&body))
}

async fn new_order(fixture: &Fixture) -> i64 {
    let body = json!({ "serviceId": fixture.service.id, "totalPrice": 49_900 });
    let (status, order) = place_order(fixture, &fixture.customer_token(), body).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    order["id"].as_i64().unwrap()
}

async fn patch_order(fixture: &Fixture, token: &str, id: &str, body: Value) -> (StatusCode, String) {
    let req = TestRequest::patch().uri(&format!("/api/orders/{id}")).insert_header(bearer(token)).set_json(body);
    request(fixture, MockCardProvider::new(), req).await
}

#[actix_web::test]
async fn orders_start_pending() {
    let fixture = Fixture::new().await;
    let body = json!({
        "serviceId": fixture.service.id,
        "totalPrice": 49_900,
        "requirements": { "projectName": "Bakery site", "brandColors": "brown" }
    });
    let (status, order) = place_order(&fixture, &fixture.customer_token(), body).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentState"], "unverified");
    assert_eq!(order["userId"], fixture.customer.id);
    assert_eq!(order["totalPrice"], 49_900);
    assert_eq!(order["requirements"]["projectName"], "Bakery site");
}

#[actix_web::test]
async fn invalid_orders_are_rejected() {
    let fixture = Fixture::new().await;
    let token = fixture.customer_token();
    let (status, body) = place_order(&fixture, &token, json!({ "serviceId": fixture.service.id, "totalPrice": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, body) = place_order(&fixture, &token, json!({ "serviceId": 999, "totalPrice": 100 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Service not found");
    let req = TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({ "serviceId": fixture.service.id, "totalPrice": 100 }));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn order_lookup_status_codes() {
    let fixture = Fixture::new().await;
    let id = new_order(&fixture).await;
    let customer = fixture.customer_token();

    let req = TestRequest::get().uri(&format!("/api/orders/{id}")).insert_header(bearer(&customer));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["id"], id);

    let req = TestRequest::get().uri("/api/orders/abc").insert_header(bearer(&customer));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid order ID"), "{body}");

    let req = TestRequest::get().uri("/api/orders/4242").insert_header(bearer(&customer));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "Order not found");

    let stranger = issue_token(&seed_user(&fixture.db, "stranger@solvix.test").await);
    let req = TestRequest::get().uri(&format!("/api/orders/{id}")).insert_header(bearer(&stranger));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::get().uri(&format!("/api/orders/{id}")).insert_header(bearer(&fixture.admin_token()));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn order_listings_are_scoped() {
    let fixture = Fixture::new().await;
    new_order(&fixture).await;
    let body = json!({ "serviceId": fixture.service.id, "totalPrice": 10_000 });
    let (status, _) = place_order(&fixture, &fixture.admin_token(), body).await;
    assert_eq!(status, StatusCode::CREATED);

    let req = TestRequest::get().uri("/api/orders").insert_header(bearer(&fixture.customer_token()));
    let (_, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(json(&body).as_array().map(Vec::len), Some(1));

    let req = TestRequest::get().uri("/api/orders").insert_header(bearer(&fixture.admin_token()));
    let (_, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(json(&body).as_array().map(Vec::len), Some(2));

    let req = TestRequest::get().uri("/api/admin/orders").insert_header(bearer(&fixture.customer_token()));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::get().uri("/api/admin/orders").insert_header(bearer(&fixture.admin_token()));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body).as_array().map(Vec::len), Some(2));
}

#[actix_web::test]
async fn only_admins_change_status() {
    let fixture = Fixture::new().await;
    let id = new_order(&fixture).await.to_string();
    let (status, body) =
        patch_order(&fixture, &fixture.customer_token(), &id, json!({ "status": "in-progress" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = patch_order(&fixture, &fixture.admin_token(), &id, json!({ "status": "in-progress" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json(&body);
    assert_eq!(order["status"], "in-progress");
    assert_eq!(order["version"], 1);
}

#[actix_web::test]
async fn illegal_transitions_name_both_statuses() {
    let fixture = Fixture::new().await;
    let id = new_order(&fixture).await.to_string();
    let admin = fixture.admin_token();
    let (status, body) = patch_order(&fixture, &admin, &id, json!({ "status": "completed" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Cannot change order status from pending to completed");

    let (status, _) = patch_order(&fixture, &admin, &id, json!({ "status": "cancelled" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = patch_order(&fixture, &admin, &id, json!({ "status": "in-progress" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Cannot change order status from cancelled to in-progress");

    let (status, _) = patch_order(&fixture, &admin, "777", json!({ "status": "in-progress" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = patch_order(&fixture, &admin, &id, json!({ "status": "shipped" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn owners_replace_requirements() {
    let fixture = Fixture::new().await;
    let id = new_order(&fixture).await.to_string();
    let customer = fixture.customer_token();
    let first = json!({ "requirements": { "projectName": "First draft" } });
    let (status, _) = patch_order(&fixture, &customer, &id, first).await;
    assert_eq!(status, StatusCode::OK);
    let second = json!({ "requirements": { "projectName": "Final", "technologies": ["rust", "htmx"] } });
    let (status, body) = patch_order(&fixture, &customer, &id, second).await;
    assert_eq!(status, StatusCode::OK);
    let order = json(&body);
    assert_eq!(order["requirements"]["projectName"], "Final");
    assert_eq!(order["requirements"]["technologies"][1], "htmx");
    assert_eq!(order["status"], "pending");

    let (status, body) = patch_order(&fixture, &customer, &id, json!({ "requirements": { "projectName": " " } })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, _) = patch_order(&fixture, &customer, &id, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn refused_updates_leave_the_order_untouched() {
    let fixture = Fixture::new().await;
    let id = new_order(&fixture).await.to_string();
    let admin = fixture.admin_token();
    let body = json!({ "status": "completed", "requirements": { "projectName": "Sneaky" } });
    let (status, body) = patch_order(&fixture, &admin, &id, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Cannot change order status from pending to completed");

    let body = json!({ "status": "in-progress", "requirements": { "projectName": " " } });
    let (status, _) = patch_order(&fixture, &admin, &id, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::get().uri(&format!("/api/orders/{id}")).insert_header(bearer(&admin));
    let (_, body) = request(&fixture, MockCardProvider::new(), req).await;
    let order = json(&body);
    assert_eq!(order["status"], "pending");
    assert!(order["requirements"].is_null(), "{order}");

    let body = json!({ "status": "in-progress", "requirements": { "projectName": "Kickoff" } });
    let (status, body) = patch_order(&fixture, &admin, &id, body).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json(&body);
    assert_eq!(order["status"], "in-progress");
    assert_eq!(order["requirements"]["projectName"], "Kickoff");
}
