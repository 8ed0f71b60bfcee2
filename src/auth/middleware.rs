use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;

use super::jwt::{JwtUtils, TokenVerifyResult};
use crate::model::auth::AuthenticatedUser;
use crate::model::global_error::{AppError, ErrorCode};

pub struct AuthMiddleware;

// 미들웨어 팩토리
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
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Authorization 헤더 우선, 없으면 accessToken 쿠키
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|value| value.to_string())
            .or_else(|| req.cookie("accessToken").map(|cookie| cookie.value().to_string()));

        let auth_result = match token {
            Some(token) => match JwtUtils::verify_token(&token) {
                TokenVerifyResult::Valid(claims) => match AuthenticatedUser::try_from(claims) {
                    Ok(user) => {
                        req.extensions_mut().insert(user);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                TokenVerifyResult::Expired => Err(AppError::unauthorized(ErrorCode::ExpiredAuthToken)),
                TokenVerifyResult::Invalid => Err(AppError::unauthorized(ErrorCode::InvalidAuthToken)),
            },
            None => Err(AppError::unauthorized(ErrorCode::AuthenticationFailed)),
        };

        let fut = self.service.call(req);
        Box::pin(async move {
            match auth_result {
                Ok(_) => fut.await,
                Err(e) => Err(e.into()),
            }
        })
    }
}
