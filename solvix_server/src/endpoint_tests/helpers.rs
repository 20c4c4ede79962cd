use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::Duration;
use serde_json::Value;
use solvix_common::Secret;
use solvix_engine::{
    db_types::{Service as CatalogService, User},
    events::EventProducers,
    test_utils::prepare_env::{fresh_database, seed_service, seed_user},
    CatalogApi,
    NotificationApi,
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
    UserApi,
};

use super::mocks::MockCardProvider;
use crate::{
    auth::TokenIssuer,
    config::{AuthConfig, StripeConfig},
    middleware::StripeSignatureMiddlewareFactory,
    routes::*,
};

// DO NOT re-use these secrets anywhere.
pub const TEST_JWT_SECRET: &str = "endpoint-tests-jwt-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

pub fn auth_config() -> AuthConfig {
    AuthConfig::new(TEST_JWT_SECRET, Duration::hours(1))
}

pub fn test_stripe_config() -> StripeConfig {
    StripeConfig {
        publishable_key: Some("pk_test_solvix".into()),
        webhook_secret: Secret::new(TEST_WEBHOOK_SECRET.to_string()),
        ..StripeConfig::default()
    }
}

pub fn issue_token(user: &User) -> String {
    TokenIssuer::new(&auth_config()).issue_token(user).expect("Failed to issue token")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// A migrated database with an admin (the first user), a customer and one service in the catalogue.
pub struct Fixture {
    pub db: SqliteDatabase,
    pub admin: User,
    pub customer: User,
    pub service: CatalogService,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = fresh_database().await;
        let admin = seed_user(&db, "admin@solvix.test").await;
        let customer = seed_user(&db, "customer@solvix.test").await;
        let service = seed_service(&db, "Landing page", 49_900).await;
        Self { db, admin, customer, service }
    }

    pub fn admin_token(&self) -> String {
        issue_token(&self.admin)
    }

    pub fn customer_token(&self) -> String {
        issue_token(&self.customer)
    }
}

/// Mounts every `/api` route over `db`, the way the server does, but with a mocked card provider.
pub fn configure(db: SqliteDatabase, provider: MockCardProvider) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let stripe = test_stripe_config();
        let webhooks = web::scope("/webhooks")
            .wrap(StripeSignatureMiddlewareFactory::new(
                stripe.webhook_secret.clone(),
                stripe.webhook_tolerance,
                stripe.signature_checks,
            ))
            .service(StripeWebhookRoute::<SqliteDatabase>::new());
        let api = web::scope("/api")
            .service(RegisterRoute::<SqliteDatabase>::new())
            .service(LoginRoute::<SqliteDatabase>::new())
            .service(AdminLoginRoute::<SqliteDatabase>::new())
            .service(CurrentUserRoute::<SqliteDatabase>::new())
            .service(AllUsersRoute::<SqliteDatabase>::new())
            .service(ServicesRoute::<SqliteDatabase>::new())
            .service(CreateServiceRoute::<SqliteDatabase>::new())
            .service(stripe_config)
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(AllOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderRoute::<SqliteDatabase>::new())
            .service(CreatePaymentIntentRoute::<SqliteDatabase, MockCardProvider>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase>::new())
            .service(PaymentStatusRoute::<SqliteDatabase>::new())
            .service(MyNotificationsRoute::<SqliteDatabase>::new())
            .service(MarkNotificationReadRoute::<SqliteDatabase>::new())
            .service(AdminNotificationsRoute::<SqliteDatabase>::new())
            .service(MarkAdminNotificationReadRoute::<SqliteDatabase>::new())
            .service(webhooks);
        cfg.app_data(web::Data::new(OrderFlowApi::new(db.clone(), EventProducers::default())))
            .app_data(web::Data::new(OrderQueryApi::new(db.clone())))
            .app_data(web::Data::new(NotificationApi::new(db.clone())))
            .app_data(web::Data::new(CatalogApi::new(db.clone())))
            .app_data(web::Data::new(UserApi::new(db)))
            .app_data(web::Data::new(TokenIssuer::new(&auth_config())))
            .app_data(web::Data::new(provider))
            .app_data(web::Data::new(stripe))
            .service(api);
    }
}

/// Calls the service and returns the status and body. Errors raised by middleware are rendered the same way the
/// server renders them, so callers do not need to care where a request was rejected.
pub async fn call<S, B>(app: &S, req: Request) -> (StatusCode, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match test::try_call_service(app, req).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let status = e.as_response_error().status_code();
            (status, serde_json::json!({ "error": e.to_string() }).to_string())
        },
    }
}

/// Builds an app over `fixture`'s database and makes a single request.
pub async fn request(fixture: &Fixture, provider: MockCardProvider, req: TestRequest) -> (StatusCode, String) {
    request_with_db(&fixture.db, provider, req).await
}

pub async fn request_with_db(
    db: &SqliteDatabase,
    provider: MockCardProvider,
    req: TestRequest,
) -> (StatusCode, String) {
    let app = test::init_service(App::new().configure(configure(db.clone(), provider))).await;
    call(&app, req.to_request()).await
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}
