//! Stripe webhook signature middleware for Actix Web.
//!
//! Stripe signs every webhook it sends with the endpoint's signing secret (`SOLVIX_STRIPE_WEBHOOK_SECRET`). The
//! signature and a timestamp arrive in the `Stripe-Signature` header; see
//! [`verify_webhook_signature`](crate::integrations::stripe::verify_webhook_signature) for the scheme.
//!
//! Wrap the webhook scope in this middleware. Requests with a missing, invalid or stale signature are rejected with a
//! 400 before they reach the handler.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use solvix_common::Secret;

use crate::{
    errors::ServerError,
    integrations::stripe::{verify_webhook_signature, ProviderError},
};

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

pub struct StripeSignatureMiddlewareFactory {
    secret: Secret<String>,
    tolerance: i64,
    // If false, then the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl StripeSignatureMiddlewareFactory {
    pub fn new(secret: Secret<String>, tolerance: i64, enabled: bool) -> Self {
        StripeSignatureMiddlewareFactory { secret, tolerance, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for StripeSignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = StripeSignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StripeSignatureMiddlewareService {
            secret: self.secret.clone(),
            tolerance: self.tolerance,
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct StripeSignatureMiddlewareService<S> {
    secret: Secret<String>,
    tolerance: i64,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for StripeSignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        let tolerance = self.tolerance;
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("🔐️ Checking Stripe signature for request");
            if !enabled {
                trace!("🔐️ Stripe signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ServerError::InvalidRequestBody("Failed to extract request data.".into())
            })?;
            let header = req
                .headers()
                .get(STRIPE_SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    warn!("🔐️ No Stripe signature found in webhook request. Denying access.");
                    ServerError::from(ProviderError::InvalidSignature("No Stripe-Signature header".into()))
                })?
                .to_string();
            match verify_webhook_signature(data.as_ref(), &header, &secret, tolerance, Utc::now().timestamp()) {
                Ok(()) => {
                    trace!("🔐️ Stripe signature check for request ✅️");
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Rejected Stripe webhook. {e}");
                    Err(ServerError::from(e).into())
                },
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
