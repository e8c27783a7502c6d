//! API Middleware Service
//!
//! Actix-web middleware that checks the shared API key on every
//! non-public path. Without a configured key every request passes.

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;
use tracing::warn;

use super::auth::{extract_api_key, key_matches};

/// Middleware factory for API key authentication
pub struct ApiMiddleware {
    api_key: Option<Rc<str>>,
    /// Paths that don't require authentication
    public_paths: Rc<Vec<String>>,
}

impl ApiMiddleware {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()).map(Rc::from),
            public_paths: Rc::new(vec!["/health".to_string(), "/api-docs".to_string()]),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Transform = ApiMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApiMiddlewareService {
            service: Rc::new(service),
            api_key: self.api_key.clone(),
            public_paths: self.public_paths.clone(),
        })
    }
}

/// The actual middleware service
pub struct ApiMiddlewareService<S> {
    service: Rc<S>,
    api_key: Option<Rc<str>>,
    public_paths: Rc<Vec<String>>,
}

impl<S> ApiMiddlewareService<S> {
    fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

impl<S, B> Service<ServiceRequest> for ApiMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut core::task::Context<'_>) -> core::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let expected = match &self.api_key {
            Some(key) if !self.is_public_path(req.path()) => key.clone(),
            // Public path, or no key configured
            _ => {
                return Box::pin(async move {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                });
            }
        };

        Box::pin(async move {
            let message = match extract_api_key(&req) {
                Some(provided) if key_matches(&expected, &provided) => {
                    let res = service.call(req).await?;
                    return Ok(res.map_into_left_body());
                }
                Some(_) => "Invalid API key",
                None => "API key required. Provide via X-API-Key header or Authorization: Bearer <key>",
            };

            warn!(path = %req.path(), "Rejected unauthenticated request");
            let response = HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "unauthorized",
                "message": message
            }));
            Ok(req.into_response(response).map_into_right_body())
        })
    }
}
