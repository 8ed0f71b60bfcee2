use actix_web::{get, post, web, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use regex::Regex;
use sea_orm::{ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait};
use std::sync::LazyLock;
use crate::auth::jwt::{build_access_token_cookie, build_refresh_token_cookie, JwtUtils, TokenVerifyResult, REFRESH_ROLE};
use crate::entity::user::{self, Entity as UserEntity, UserRole};
use crate::model::auth::{AuthenticatedUser, LoginRequest, RegisterRequest, UserResponse};
use crate::model::global_error::{AppError, ErrorCode, ValidationFieldError};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("이메일 정규식이 잘못되었습니다")
});

#[post("/auth/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    validate_register_request(&body.name, &body.email, &body.password)?;

    let txn = db.begin().await?;

    let existing_user = UserEntity::find()
        .filter(user::Column::Email.eq(body.email.trim()))
        .one(&txn)
        .await?;

    if existing_user.is_some() {
        txn.rollback().await.ok();
        return Err(AppError::bad_request(ErrorCode::DuplicateAccountEmail));
    }

    let hashed_password = hash(&body.password, DEFAULT_COST)
        .map_err(|_| AppError::internal_error(ErrorCode::InternalError))?;

    let new_user = user::ActiveModel {
        name: Set(body.name.trim().to_string()),
        email: Set(body.email.trim().to_string()),
        password: Set(hashed_password),
        role: Set(UserRole::Teacher),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        ..Default::default()
    };

    let user = new_user.insert(&txn).await?;

    let access_token = JwtUtils::generate_token(user.id, &user.role.to_value())?;
    let refresh_token_str = JwtUtils::generate_refresh_token(user.id)?;

    txn.commit().await?;

    Ok(HttpResponse::Created()
        .cookie(build_access_token_cookie(&access_token))
        .cookie(build_refresh_token_cookie(&refresh_token_str))
        .finish()
    )
}

#[post("/auth/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    validate_login_request(&body.email, &body.password)?;

    let user = UserEntity::find()
        .filter(user::Column::Email.eq(body.email.trim()))
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::bad_request(ErrorCode::InvalidEmailPwd))?;

    let is_valid = verify(&body.password, &user.password)
        .map_err(|_| AppError::internal_error(ErrorCode::InternalError))?;

    if !is_valid {
        return Err(AppError::bad_request(ErrorCode::InvalidEmailPwd));
    }

    let access_token = JwtUtils::generate_token(user.id, &user.role.to_value())?;
    let refresh_token_str = JwtUtils::generate_refresh_token(user.id)?;

    Ok(HttpResponse::Ok()
        .cookie(build_access_token_cookie(&access_token))
        .cookie(build_refresh_token_cookie(&refresh_token_str))
        .finish()
    )
}

#[post("/auth/refresh")]
pub async fn refresh_token(
    req: actix_web::HttpRequest,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let refresh_token_cookie = req.cookie("refreshToken")
        .ok_or_else(|| AppError::unauthorized(ErrorCode::InvalidAuthToken))?;

    match JwtUtils::verify_token(refresh_token_cookie.value()) {
        TokenVerifyResult::Valid(claims) => {
            if claims.role != REFRESH_ROLE {
                return Err(AppError::bad_request(ErrorCode::NotRefreshToken));
            }

            let user_id = claims.sub.parse::<i32>()
                .map_err(|_| AppError::internal_error(ErrorCode::InternalError))?;

            let user = UserEntity::find_by_id(user_id)
                .one(db.get_ref())
                .await?
                .ok_or_else(|| AppError::not_found(ErrorCode::MemberNotFound))?;

            let new_access_token = JwtUtils::generate_token(user.id, &user.role.to_value())?;

            Ok(HttpResponse::Ok()
                .cookie(build_access_token_cookie(&new_access_token))
                .finish())
        }
        TokenVerifyResult::Expired | TokenVerifyResult::Invalid => {
            Err(AppError::bad_request(ErrorCode::InvalidRefreshToken))
        }
    }
}

#[get("/auth/me")]
pub async fn get_me(
    db: web::Data<DatabaseConnection>,
    auth_user: web::ReqData<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
    let user = UserEntity::find_by_id(auth_user.id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::MemberNotFound))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

fn validate_login_request(email: &str, password: &str) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if email.trim().is_empty() {
        errors.push(ValidationFieldError {
            field: "email".to_string(),
            message: "이메일은 필수입니다.".to_string(),
        });
    }

    if password.len() < 8 {
        errors.push(ValidationFieldError {
            field: "password".to_string(),
            message: "비밀번호는 최소 8자 이상이어야 합니다.".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationError(errors))
    }
}

fn validate_register_request(name: &str, email: &str, password: &str) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push(ValidationFieldError {
            field: "name".to_string(),
            message: "이름은 필수입니다.".to_string(),
        });
    }

    if email.trim().is_empty() {
        errors.push(ValidationFieldError {
            field: "email".to_string(),
            message: "이메일은 필수입니다.".to_string(),
        });
    } else if !EMAIL_REGEX.is_match(email.trim()) {
        errors.push(ValidationFieldError {
            field: "email".to_string(),
            message: "유효한 이메일 형식이 아닙니다.".to_string(),
        });
    }

    if password.len() < 8 {
        errors.push(ValidationFieldError {
            field: "password".to_string(),
            message: "비밀번호는 최소 8자 이상이어야 합니다.".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationError(errors))
    }
}
