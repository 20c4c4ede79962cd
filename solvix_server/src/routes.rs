//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate function. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any I/O (database calls, requests to Stripe) must be awaited,
//! never blocked on.
//!
//! Routes are mounted under `/api` in [`crate::server`], so the paths below are relative to that scope.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use serde_json::json;
use solvix_engine::{
    db_types::{Actor, NewOrder, NewPayment, NewService},
    payment_objects::CryptoClaim,
    traits::{CatalogManagement, NotificationManagement, OrderFlowError, OrderLifecycleDatabase, OrderQueries},
    CatalogApi,
    NotificationApi,
    OrderFlowApi,
    OrderQueryApi,
    UserApi,
    UserManagement,
};

use crate::{
    auth::{JwtClaims, TokenIssuer},
    config::StripeConfig,
    data_objects::{
        AuthResponse,
        CreateIntentRequest,
        CreateIntentResponse,
        CredentialsRequest,
        NewOrderRequest,
        PaymentStatusResponse,
        StripeConfigResponse,
        UpdateOrderRequest,
        VerificationResponse,
        WebhookReceipt,
    },
    errors::ServerError,
    integrations::stripe::{CardPaymentProvider, ProviderError, StripeEvent},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires admin)  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::admin_only());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Accounts  ----------------------------------------------------
route!(register => Post "/register" impl UserManagement);
/// Creates a new account and logs it in.
///
/// The very first account registered on a fresh installation becomes the store admin.
pub async fn register<B: UserManagement>(
    body: web::Json<CredentialsRequest>,
    api: web::Data<UserApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let CredentialsRequest { email, password } = body.into_inner();
    debug!("💻️ POST register for {email}");
    let user = api.register(&email, &password).await?;
    let token = signer.issue_token(&user)?;
    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

route!(login => Post "/login" impl UserManagement);
pub async fn login<B: UserManagement>(
    body: web::Json<CredentialsRequest>,
    api: web::Data<UserApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let CredentialsRequest { email, password } = body.into_inner();
    debug!("💻️ POST login for {email}");
    let user = api.authenticate(&email, &password).await?;
    let token = signer.issue_token(&user)?;
    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

route!(admin_login => Post "/admin/login" impl UserManagement);
/// Same as `/login`, but refuses accounts that are not admins.
pub async fn admin_login<B: UserManagement>(
    body: web::Json<CredentialsRequest>,
    api: web::Data<UserApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let CredentialsRequest { email, password } = body.into_inner();
    debug!("💻️ POST admin login for {email}");
    let user = api.authenticate_admin(&email, &password).await?;
    let token = signer.issue_token(&user)?;
    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

route!(current_user => Get "/user" impl UserManagement);
pub async fn current_user<B: UserManagement>(
    claims: JwtClaims,
    api: web::Data<UserApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET current user #{}", claims.sub);
    let user = api.user_by_id(claims.sub).await?;
    Ok(HttpResponse::Ok().json(user))
}

route!(all_users => Get "/admin/users" impl UserManagement where requires admin);
pub async fn all_users<B: UserManagement>(api: web::Data<UserApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET all users");
    let users = api.all_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

//----------------------------------------------   Catalogue  ----------------------------------------------------
route!(services => Get "/services" impl CatalogManagement);
pub async fn services<B: CatalogManagement>(api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET services");
    let services = api.services().await?;
    Ok(HttpResponse::Ok().json(services))
}

route!(create_service => Post "/services" impl CatalogManagement where requires admin);
pub async fn create_service<B: CatalogManagement>(
    body: web::Json<NewService>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let service = body.into_inner();
    debug!("💻️ POST new service {}", service.name);
    let service = api.create_service(service).await?;
    Ok(HttpResponse::Created().json(service))
}

#[get("/config/stripe")]
/// The publishable key the browser needs to load the card payment form.
pub async fn stripe_config(config: web::Data<StripeConfig>) -> Result<HttpResponse, ServerError> {
    let publishable_key = config.publishable_key.clone().ok_or_else(|| {
        warn!("💻️ A client asked for the Stripe configuration, but no publishable key is set");
        ServerError::ConfigurationError("Stripe is not configured".into())
    })?;
    Ok(HttpResponse::Ok().json(StripeConfigResponse { publishable_key }))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderLifecycleDatabase);
/// Places a new order for the logged-in user. The order starts out `pending` and every admin is notified.
pub async fn create_order<B: OrderLifecycleDatabase>(
    claims: JwtClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let NewOrderRequest { service_id, total_price, requirements } = body.into_inner();
    debug!("💻️ POST new order for service #{service_id} by user #{}", claims.sub);
    let mut order = NewOrder::new(claims.sub, service_id, total_price);
    if let Some(doc) = requirements {
        order = order.with_requirements(doc);
    }
    let order = api.create_order(&claims.actor(), order).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl OrderQueries);
/// Users see their own orders. Admins see every order.
pub async fn my_orders<B: OrderQueries>(
    claims: JwtClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for user #{}", claims.sub);
    let orders = api.orders_for_actor(&claims.actor()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(all_orders => Get "/admin/orders" impl OrderQueries where requires admin);
pub async fn all_orders<B: OrderQueries>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET all orders");
    let orders = api.all_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl OrderQueries);
pub async fn order_by_id<B: OrderQueries>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_id(&path, "order")?;
    debug!("💻️ GET order #{order_id} for user #{}", claims.sub);
    let order = api.order_for_actor(order_id, &claims.actor()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order => Patch "/orders/{id}" impl OrderLifecycleDatabase);
/// Changes an order's status, its requirements, or both.
///
/// Only admins may change the status, and only along the allowed transitions. The owner (or an admin) may replace the
/// requirements at any time.
pub async fn update_order<B: OrderLifecycleDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<UpdateOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_id(&path, "order")?;
    let UpdateOrderRequest { status, requirements } = body.into_inner();
    let actor = claims.actor();
    if status.is_some() && !actor.is_admin {
        warn!("💻️ {actor} tried to change the status of order #{order_id}");
        return Err(ServerError::InsufficientPermissions("Admin access required".into()));
    }
    debug!("💻️ PATCH order #{order_id} by {actor}");
    let order = api.update_order(order_id, status, requirements, &actor).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(create_payment_intent => Post "/payments/create-intent" impl OrderLifecycleDatabase, CardPaymentProvider);
/// Starts a card checkout.
///
/// Creates the order for the first item in the cart, opens a Stripe payment intent for `amount` and records a
/// `pending` card payment against it. The browser confirms the card with the returned client secret; the outcome
/// arrives later on the Stripe webhook.
pub async fn create_payment_intent<B, P>(
    claims: JwtClaims,
    body: web::Json<CreateIntentRequest>,
    api: web::Data<OrderFlowApi<B>>,
    provider: web::Data<P>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderLifecycleDatabase,
    P: CardPaymentProvider,
{
    let CreateIntentRequest { amount, items } = body.into_inner();
    let service_id = items.first().map(|item| item.id).ok_or_else(|| {
        debug!("💻️ Payment intent request from user #{} has an empty cart", claims.sub);
        ServerError::ValidationError("At least one item is required".into())
    })?;
    debug!("💻️ POST create-intent for {amount} by user #{}", claims.sub);
    let order = api.create_order(&claims.actor(), NewOrder::new(claims.sub, service_id, amount)).await?;
    let items_json = serde_json::to_string(&items).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    let metadata = vec![("orderId".to_string(), order.id.to_string()), ("items".to_string(), items_json)];
    let intent = provider.create_payment_intent(order.total_price, &metadata).await.map_err(|e| {
        error!("💻️ Could not create a payment intent for order #{}. {e}", order.id);
        e
    })?;
    let client_secret = intent.client_secret.clone().ok_or_else(|| {
        ProviderError::InvalidResponse(format!("Payment intent {} has no client secret", intent.id))
    })?;
    let payment =
        NewPayment::card(&order, &intent.id, json!({ "items": items })).with_customer_email(claims.email.as_str());
    api.register_card_payment(payment).await?;
    info!("💻️ Payment intent {} opened for order #{}", intent.id, order.id);
    Ok(HttpResponse::Ok().json(CreateIntentResponse { client_secret, order_id: order.id }))
}

route!(verify_payment => Post "/payments/verify" impl OrderLifecycleDatabase);
/// Records a customer's claim that they paid in crypto. Claims are only ever stored as `pending`; someone has to check
/// the chain by hand.
pub async fn verify_payment<B: OrderLifecycleDatabase>(
    claims: JwtClaims,
    body: web::Json<CryptoClaim>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let mut claim = body.into_inner();
    if claim.customer_email.is_none() {
        claim.customer_email = Some(claims.email.clone());
    }
    debug!("💻️ POST crypto payment claim by user #{}", claims.sub);
    let payment = api.submit_crypto_claim(&claims.actor(), claim).await?;
    trace!("💻️ Crypto claim stored as {}", payment.correlation_id);
    Ok(HttpResponse::Ok().json(VerificationResponse::submitted()))
}

route!(payment_status => Get "/payments/{order_id}/status" impl OrderQueries);
/// Polled by the checkout page until the payment leaves `pending`.
pub async fn payment_status<B: OrderQueries>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let correlation_id = path.into_inner();
    trace!("💻️ GET payment status for {correlation_id}");
    let payment = api.payment_status(&correlation_id).await?;
    let result =
        PaymentStatusResponse { status: payment.status, order_id: payment.correlation_id, updated_at: payment.updated_at };
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(stripe_webhook => Post "/stripe" impl OrderLifecycleDatabase);
/// Stripe payment intent events.
///
/// The signature has already been checked by the middleware on the webhook scope. Events for payments we know nothing
/// about are acknowledged, so that Stripe stops retrying them. Storage errors are not, so that it does.
pub async fn stripe_webhook<B: OrderLifecycleDatabase>(
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let event = serde_json::from_slice::<StripeEvent>(&body).map_err(|e| {
        warn!("💻️ Could not parse Stripe webhook body. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    info!("💻️ Stripe event {} ({}) received", event.id, event.event_type);
    let Some(report) = event.payment_report()? else {
        debug!("💻️ Ignoring Stripe event type {}", event.event_type);
        return Ok(HttpResponse::Ok().json(WebhookReceipt::received()));
    };
    match api.record_payment_outcome(report).await {
        Ok(result) if result.changed => {
            info!("💻️ Payment for order #{} is now {}", result.order.id, result.payment.status)
        },
        Ok(result) => debug!("💻️ Stripe event {} did not change order #{}", event.id, result.order.id),
        Err(e @ (OrderFlowError::OrderNotFound(_) | OrderFlowError::PaymentNotFound(_))) => {
            warn!("💻️ Stripe event {} does not match anything we know about. {e}", event.id)
        },
        Err(e) => {
            error!("💻️ Could not apply Stripe event {}. {e}", event.id);
            return Err(e.into());
        },
    }
    Ok(HttpResponse::Ok().json(WebhookReceipt::received()))
}

//----------------------------------------------   Notifications  ----------------------------------------------------
route!(my_notifications => Get "/notifications" impl NotificationManagement);
pub async fn my_notifications<B: NotificationManagement>(
    claims: JwtClaims,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET notifications for user #{}", claims.sub);
    notifications_for(&claims.actor(), api.as_ref()).await
}

route!(mark_notification_read => Patch "/notifications/{id}/read" impl NotificationManagement);
pub async fn mark_notification_read<B: NotificationManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    mark_read(&path, &claims.actor(), api.as_ref()).await
}

route!(admin_notifications => Get "/admin/notifications" impl NotificationManagement where requires admin);
pub async fn admin_notifications<B: NotificationManagement>(
    claims: JwtClaims,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET admin notifications for #{}", claims.sub);
    notifications_for(&claims.actor(), api.as_ref()).await
}

route!(mark_admin_notification_read => Patch "/admin/notifications/{id}/read" impl NotificationManagement where requires admin);
pub async fn mark_admin_notification_read<B: NotificationManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    mark_read(&path, &claims.actor(), api.as_ref()).await
}

async fn notifications_for<B: NotificationManagement>(
    actor: &Actor,
    api: &NotificationApi<B>,
) -> Result<HttpResponse, ServerError> {
    let notifications = api.notifications_for(actor).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

async fn mark_read<B: NotificationManagement>(
    id: &str,
    actor: &Actor,
    api: &NotificationApi<B>,
) -> Result<HttpResponse, ServerError> {
    let notification_id = parse_id(id, "notification")?;
    debug!("💻️ PATCH notification #{notification_id} read by {actor}");
    let notification = api.mark_read(notification_id, actor).await?;
    Ok(HttpResponse::Ok().json(notification))
}

fn parse_id(raw: &str, kind: &str) -> Result<i64, ServerError> {
    raw.parse::<i64>().map_err(|_| {
        debug!("💻️ {raw} is not a valid {kind} id");
        ServerError::InvalidRequestPath(format!("Invalid {kind} ID"))
    })
}
