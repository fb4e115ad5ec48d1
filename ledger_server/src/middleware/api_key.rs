//! API key middleware for Actix Web.
//!
//! Guards the admin API. Callers supply the shared secret (`LPG_ADMIN_API_KEY`) in the `X-Api-Key` header. The
//! comparison does not short-circuit on the first differing byte.
//!
//! If no key is configured, every request is refused.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    ResponseError,
};
use futures::future::LocalBoxFuture;
use ledger_common::Secret;
use log::{trace, warn};

use crate::errors::ServerError;

pub const API_KEY_HEADER: &str = "X-Api-Key";

pub struct ApiKeyMiddlewareFactory {
    key: Secret<String>,
}

impl ApiKeyMiddlewareFactory {
    pub fn new(key: Secret<String>) -> Self {
        ApiKeyMiddlewareFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = ApiKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) }))
    }
}

pub struct ApiKeyMiddlewareService<S> {
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<EitherBody<B>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let authorised = {
            let supplied = req.headers().get(API_KEY_HEADER).map(|v| v.as_bytes());
            match supplied {
                _ if self.key.is_empty() => {
                    warn!("🔐️ Admin request to {} refused. No admin API key is configured.", req.path());
                    false
                },
                Some(candidate) => self.key.matches(candidate),
                None => false,
            }
        };
        Box::pin(async move {
            if authorised {
                trace!("🔐️ API key check for {} ✅️", req.path());
                let res = service.call(req).await?;
                Ok(res.map_into_left_body())
            } else {
                warn!("🔐️ Missing or invalid API key for {}. Denying access.", req.path());
                let res = req.into_response(ServerError::Unauthorized.error_response());
                Ok(res.map_into_right_body())
            }
        })
    }
}
