use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use solvix_engine::test_utils::prepare_env::{fresh_database, TEST_PASSWORD};

use super::{
    helpers::{bearer, json, request, request_with_db, Fixture},
    mocks::MockCardProvider,
};

#[actix_web::test]
async fn first_registration_is_the_admin() {
    let db = fresh_database().await;
    let req = TestRequest::post()
        .uri("/api/register")
        .set_json(json!({ "email": " Owner@Solvix.test ", "password": "a long password" }));
    let (status, body) = request_with_db(&db, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let body = json(&body);
    assert_eq!(body["user"]["email"], "owner@solvix.test");
    assert_eq!(body["user"]["isAdmin"], true);
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let req = TestRequest::post()
        .uri("/api/register")
        .set_json(json!({ "email": "second@solvix.test", "password": "another password" }));
    let (status, body) = request_with_db(&db, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(json(&body)["user"]["isAdmin"], false);
}

#[actix_web::test]
async fn duplicate_and_invalid_registrations() {
    let fixture = Fixture::new().await;
    let req = TestRequest::post()
        .uri("/api/register")
        .set_json(json!({ "email": "CUSTOMER@solvix.test", "password": "a long password" }));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "User already exists");

    let req = TestRequest::post()
        .uri("/api/register")
        .set_json(json!({ "email": "new@solvix.test", "password": "short" }));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_and_fetch_current_user() {
    let fixture = Fixture::new().await;
    let req = TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "customer@solvix.test", "password": TEST_PASSWORD }));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = json(&body)["token"].as_str().unwrap().to_string();

    let req = TestRequest::get().uri("/api/user").insert_header(bearer(&token));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["id"], fixture.customer.id);
}

#[actix_web::test]
async fn bad_credentials_are_rejected() {
    let fixture = Fixture::new().await;
    let req = TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "customer@solvix.test", "password": "not the password" }));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Invalid email or password");

    let req = TestRequest::post()
        .uri("/api/admin/login")
        .set_json(json!({ "email": "customer@solvix.test", "password": TEST_PASSWORD }));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::post()
        .uri("/api/admin/login")
        .set_json(json!({ "email": "admin@solvix.test", "password": TEST_PASSWORD }));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["user"]["isAdmin"], true);
}

#[actix_web::test]
async fn tokens_are_required() {
    let fixture = Fixture::new().await;
    let req = TestRequest::get().uri("/api/user");
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Not authenticated");

    let req = TestRequest::get().uri("/api/user").insert_header(bearer("not.a.token"));
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn only_admins_list_users() {
    let fixture = Fixture::new().await;
    let req = TestRequest::get().uri("/api/admin/users");
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::get().uri("/api/admin/users").insert_header(bearer(&fixture.customer_token()));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Admin access required"), "{body}");

    let req = TestRequest::get().uri("/api/admin/users").insert_header(bearer(&fixture.admin_token()));
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body).as_array().map(Vec::len), Some(2));
}

#[actix_web::test]
async fn catalogue_is_public_but_admin_managed() {
    let fixture = Fixture::new().await;
    let (status, body) = request(&fixture, MockCardProvider::new(), TestRequest::get().uri("/api/services")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)[0]["name"], "Landing page");

    let new_service = json!({ "name": "Shop", "description": "Online shop", "basePrice": 149_900, "type": "ecommerce" });
    let req = TestRequest::post()
        .uri("/api/services")
        .insert_header(bearer(&fixture.customer_token()))
        .set_json(new_service.clone());
    let (status, _) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req =
        TestRequest::post().uri("/api/services").insert_header(bearer(&fixture.admin_token())).set_json(new_service);
    let (status, body) = request(&fixture, MockCardProvider::new(), req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(json(&body)["basePrice"], 149_900);
}

#[actix_web::test]
async fn stripe_publishable_key() {
    let fixture = Fixture::new().await;
    let (status, body) =
        request(&fixture, MockCardProvider::new(), TestRequest::get().uri("/api/config/stripe")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["publishableKey"], "pk_test_solvix");
}
