use chrono::{DateTime, Utc};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::entity::user::{self, UserRole};
use crate::model::global_error::{AppError, ErrorCode};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Claims {
    pub sub: String,      // 사용자 ID
    pub role: String,     // 사용자 역할 (리프레시 토큰은 "refresh")
    pub exp: usize,       // 만료 시간 (Unix timestamp)
    pub iat: usize,       // 발행 시간 (Unix timestamp)
}

// 미들웨어가 토큰 검증 후 요청 확장에 싣는 호출자 신원
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub role: UserRole,
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims.sub.parse::<i32>()
            .map_err(|_| AppError::unauthorized(ErrorCode::InvalidAuthToken))?;
        let role = UserRole::try_from_value(&claims.role)
            .map_err(|_| AppError::unauthorized(ErrorCode::InvalidAuthToken))?;

        Ok(AuthenticatedUser { id, role })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            created_at: model.created_at,
        }
    }
}

// 시프트/대체 요청 응답에 중첩되는 사용자 요약
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl From<user::Model> for UserSummary {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
        }
    }
}
