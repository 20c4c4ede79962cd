use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use solvix_engine::{
    events::EventProducers,
    CatalogApi,
    NotificationApi,
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
    UserApi,
};

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    integrations::{email::create_email_event_handlers, stripe::StripeClient},
    middleware::StripeSignatureMiddlewareFactory,
    outbox_worker::start_outbox_worker,
    routes::{
        health,
        stripe_config,
        AdminLoginRoute,
        AdminNotificationsRoute,
        AllOrdersRoute,
        AllUsersRoute,
        CreateOrderRoute,
        CreatePaymentIntentRoute,
        CreateServiceRoute,
        CurrentUserRoute,
        LoginRoute,
        MarkAdminNotificationReadRoute,
        MarkNotificationReadRoute,
        MyNotificationsRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        PaymentStatusRoute,
        RegisterRoute,
        ServicesRoute,
        StripeWebhookRoute,
        UpdateOrderRoute,
        VerifyPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let handlers = create_email_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _outbox_worker = start_outbox_worker(db.clone(), config.outbox_interval);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let stripe = StripeClient::new(&config.stripe).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let query_api = OrderQueryApi::new(db.clone());
        let notification_api = NotificationApi::new(db.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let user_api = UserApi::new(db.clone());
        let jwt_signer = TokenIssuer::new(&config.auth);
        let stripe_settings = config.stripe.clone();
        let webhook_scope = web::scope("/webhooks")
            .wrap(StripeSignatureMiddlewareFactory::new(
                stripe_settings.webhook_secret.clone(),
                stripe_settings.webhook_tolerance,
                stripe_settings.signature_checks,
            ))
            .service(StripeWebhookRoute::<SqliteDatabase>::new());
        let api_scope = web::scope("/api")
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
            .service(CreatePaymentIntentRoute::<SqliteDatabase, StripeClient>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase>::new())
            .service(PaymentStatusRoute::<SqliteDatabase>::new())
            .service(MyNotificationsRoute::<SqliteDatabase>::new())
            .service(MarkNotificationReadRoute::<SqliteDatabase>::new())
            .service(AdminNotificationsRoute::<SqliteDatabase>::new())
            .service(MarkAdminNotificationReadRoute::<SqliteDatabase>::new())
            .service(webhook_scope);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("solvix::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(notification_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(user_api))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(stripe.clone()))
            .app_data(web::Data::new(stripe_settings))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Server bound to {}:{}", config.host, config.port);
    Ok(srv)
}
