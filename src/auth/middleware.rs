use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::blacklist::TokenBlacklist;
use crate::auth::token::verify_token;
use crate::error::AppError;

/// Request-level authentication.
///
/// Every route except the public ones requires a valid bearer token. On
/// success the decoded claims are inserted into request extensions for the
/// handlers and the `AuthenticatedUser` extractor.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Sign-up, login, and the health check are public.
        let path = req.path();
        if path == "/health" || path == "/signup" || path == "/login" {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let auth_header = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match auth_header {
            Some(token) => {
                match verify_token(token) {
                    Ok(claims) => {
                        // A structurally valid token may still have been
                        // logged out; the blacklist wins until expiry.
                        let revoked = req
                            .app_data::<web::Data<TokenBlacklist>>()
                            .map(|blacklist| blacklist.contains(token))
                            .unwrap_or(false);

                        if revoked {
                            let app_err =
                                AppError::Unauthorized("Token has been revoked".into());
                            return Box::pin(async move { Err(app_err.into()) });
                        }

                        req.extensions_mut().insert(claims);
                        let fut = self.service.call(req);
                        Box::pin(fut)
                    }
                    Err(app_err) => Box::pin(async move { Err(app_err.into()) }),
                }
            }
            None => {
                let app_err = AppError::Unauthorized("Missing token".into());
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}
