use crate::model::auth::Claims;
use actix_web::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::env;

const ACCESS_TOKEN_TTL_HOURS: i64 = 1;
const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

/// 리프레시 토큰의 역할 클레임에 들어가는 값.
pub const REFRESH_ROLE: &str = "refresh";

pub struct JwtUtils;

pub enum TokenVerifyResult {
    Valid(Claims),
    Expired,
    Invalid,
}

impl JwtUtils {
    fn secret() -> String {
        env::var("JWT_SECRET").expect("JWT_SECRET must be set")
    }

    fn issue(user_id: i32, role: &str, ttl: Duration) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(Self::secret().as_bytes()),
        )
    }

    pub fn generate_token(user_id: i32, role: &str) -> Result<String, JwtError> {
        Self::issue(user_id, role, Duration::hours(ACCESS_TOKEN_TTL_HOURS))
    }

    pub fn generate_refresh_token(user_id: i32) -> Result<String, JwtError> {
        Self::issue(user_id, REFRESH_ROLE, Duration::days(REFRESH_TOKEN_TTL_DAYS))
    }

    pub fn verify_token(token: &str) -> TokenVerifyResult {
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(Self::secret().as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => TokenVerifyResult::Valid(data.claims),
            Err(err) => match *err.kind() {
                ErrorKind::ExpiredSignature => TokenVerifyResult::Expired,
                _ => TokenVerifyResult::Invalid,
            },
        }
    }
}

pub fn build_access_token_cookie(token: &str) -> Cookie<'_> {
    Cookie::build("accessToken", token.to_string())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(ACCESS_TOKEN_TTL_HOURS))
        .finish()
}

pub fn build_refresh_token_cookie(token: &str) -> Cookie<'_> {
    Cookie::build("refreshToken", token.to_string())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(REFRESH_TOKEN_TTL_DAYS))
        .finish()
}
