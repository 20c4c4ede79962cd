use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use solvix_engine::test_utils::prepare_env::seed_user;

use super::{
    helpers::{bearer, issue_token, json, request, Fixture},
    mocks::MockCardProvider,
};

async fn place_order(fixture: &Fixture) -> i64 {
    let req = TestRequest::post()
        .uri("/api/orders")
        .insert_header(bearer(&fixture.customer_token()))
        .set_json(json!({ "serviceId": fixture.service.id, "totalPrice": 49_900 }));
    let (status, body) = request(fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    json(&body)["id"].as_i64().unwrap()
}

#[actix_web::test]
async fn admins_hear_about_new_orders() {
    let fixture = Fixture::new().await;
    let order_id = place_order(&fixture).await;

    let req = TestRequest::get().uri("/api/admin/notifications").insert_header(bearer(&fixture.admin_token()));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let notes = json(&body);
    assert_eq!(notes.as_array().map(Vec::len), Some(1));
    assert_eq!(notes[0]["title"], "New Order Received");
    assert_eq!(notes[0]["message"], format!("New order #{order_id} has been created"));
    assert_eq!(notes[0]["status"], "unread");

    let req = TestRequest::get().uri("/api/admin/notifications").insert_header(bearer(&fixture.customer_token()));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let id = notes[0]["id"].as_i64().unwrap();
    let req = TestRequest::patch()
        .uri(&format!("/api/admin/notifications/{id}/read"))
        .insert_header(bearer(&fixture.admin_token()));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["status"], "read");
}

#[actix_web::test]
async fn owners_hear_about_status_changes() {
    let fixture = Fixture::new().await;
    let order_id = place_order(&fixture).await;
    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{order_id}"))
        .insert_header(bearer(&fixture.admin_token()))
        .set_json(json!({ "status": "in-progress" }));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);

    let customer = fixture.customer_token();
    let req = TestRequest::get().uri("/api/notifications").insert_header(bearer(&customer));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    let notes = json(&body);
    assert_eq!(notes.as_array().map(Vec::len), Some(1));
    assert_eq!(notes[0]["title"], "Order Status Updated");
    assert_eq!(notes[0]["message"], format!("Your order #{order_id} status has been updated to in-progress"));
    let id = notes[0]["id"].as_i64().unwrap();

    // Reading twice is fine
    for _ in 0..2 {
        let req =
            TestRequest::patch().uri(&format!("/api/notifications/{id}/read")).insert_header(bearer(&customer));
        let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "read");
    }

    let stranger = issue_token(&seed_user(&fixture.db, "stranger@solvix.test").await);
    let req = TestRequest::patch().uri(&format!("/api/notifications/{id}/read")).insert_header(bearer(&stranger));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::patch().uri("/api/notifications/first/read").insert_header(bearer(&customer));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid notification ID"), "{body}");
}
