//! Access control middleware for admin-only routes.
//! This middleware can be placed on any route or service.
//!
//! It validates the bearer token on the incoming request and lets the request through only if the token belongs to an
//! admin. A missing or invalid token gets a 401 Unauthorized response; a valid token for a regular user gets a 403
//! Forbidden.
use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{auth::claims_from_request, errors::ServerError};

#[derive(Default)]
pub struct AclMiddlewareFactory;

impl AclMiddlewareFactory {
    pub fn admin_only() -> Self {
        AclMiddlewareFactory
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let claims = claims_from_request(req.request()).map_err(ServerError::from)?;
            if claims.is_admin {
                service.call(req).await
            } else {
                warn!("🔐️ User #{} tried to access admin route {}", claims.sub, req.path());
                Err(ServerError::InsufficientPermissions("Admin access required".into()).into())
            }
        })
    }
}
