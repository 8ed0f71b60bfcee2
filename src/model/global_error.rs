use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // 400 BAD REQUEST
    ValidationError,
    DuplicateAccountEmail,
    InvalidEmailPwd,
    NotRefreshToken,
    InvalidRefreshToken,
    InvalidTimeRange,
    SelfSubstituteRequest,
    BatchCreateFailed,
    BatchDeleteFailed,

    // 401 UNAUTHORIZED
    AuthenticationFailed,
    ExpiredAuthToken,
    InvalidAuthToken,

    // 403 FORBIDDEN
    NotEnoughPermission,

    // 404 NOT FOUND
    MemberNotFound,
    ShiftNotFound,
    SubstituteRequestNotFound,

    // 409 CONFLICT
    DuplicateSubstituteRequest,
    AlreadyDecidedRequest,
    AcceptedRequestImmutable,

    // 500 SERVER ERRORS
    DatabaseError,
    InternalError,
    TokenGenerationFailed,
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "유효성 검증에 실패했습니다",
            ErrorCode::DuplicateAccountEmail => "이미 등록된 이메일입니다. 로그인해주세요",
            ErrorCode::InvalidEmailPwd => "잘못된 자격 증명입니다",
            ErrorCode::NotRefreshToken => "잘못된 리프레시 토큰입니다",
            ErrorCode::InvalidRefreshToken => "리프레시 토큰이 유효하지 않습니다",
            ErrorCode::InvalidTimeRange => "종료 시간은 시작 시간보다 늦어야 합니다",
            ErrorCode::SelfSubstituteRequest => "본인이 담당한 시프트에는 대체 요청을 보낼 수 없습니다",
            ErrorCode::BatchCreateFailed => "일괄 생성에 성공한 시프트가 없습니다",
            ErrorCode::BatchDeleteFailed => "일괄 삭제에 성공한 시프트가 없습니다",

            ErrorCode::AuthenticationFailed => "인증에 실패했습니다",
            ErrorCode::ExpiredAuthToken => "로그인 토큰이 만료되었습니다",
            ErrorCode::InvalidAuthToken => "유효하지 않은 로그인 토큰입니다",

            ErrorCode::NotEnoughPermission => "권한이 부족합니다",

            ErrorCode::MemberNotFound => "사용자를 찾을 수 없습니다",
            ErrorCode::ShiftNotFound => "시프트를 찾을 수 없습니다",
            ErrorCode::SubstituteRequestNotFound => "대체 요청을 찾을 수 없습니다",

            ErrorCode::DuplicateSubstituteRequest => "이미 처리 대기 중인 대체 요청이 있습니다",
            ErrorCode::AlreadyDecidedRequest => "이미 처리된 대체 요청입니다",
            ErrorCode::AcceptedRequestImmutable => "수락된 대체 요청은 삭제할 수 없습니다",

            ErrorCode::DatabaseError => "데이터베이스 오류가 발생했습니다",
            ErrorCode::InternalError => "내부 서버 오류가 발생했습니다",
            ErrorCode::TokenGenerationFailed => "토큰 생성에 실패했습니다",
        }
    }

    pub fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            ErrorCode::ValidationError |
            ErrorCode::DuplicateAccountEmail |
            ErrorCode::InvalidEmailPwd |
            ErrorCode::NotRefreshToken |
            ErrorCode::InvalidRefreshToken |
            ErrorCode::InvalidTimeRange |
            ErrorCode::SelfSubstituteRequest |
            ErrorCode::BatchCreateFailed |
            ErrorCode::BatchDeleteFailed => StatusCode::BAD_REQUEST,

            ErrorCode::AuthenticationFailed |
            ErrorCode::ExpiredAuthToken |
            ErrorCode::InvalidAuthToken => StatusCode::UNAUTHORIZED,

            ErrorCode::NotEnoughPermission => StatusCode::FORBIDDEN,

            ErrorCode::MemberNotFound |
            ErrorCode::ShiftNotFound |
            ErrorCode::SubstituteRequestNotFound => StatusCode::NOT_FOUND,

            ErrorCode::DuplicateSubstituteRequest |
            ErrorCode::AlreadyDecidedRequest |
            ErrorCode::AcceptedRequestImmutable => StatusCode::CONFLICT,

            ErrorCode::DatabaseError |
            ErrorCode::InternalError |
            ErrorCode::TokenGenerationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationFieldError {
    pub field: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ApiError(ErrorCode, Option<String>),

    #[error("유효성 검증에 실패했습니다")]
    ValidationError(Vec<ValidationFieldError>),
}

impl AppError {
    pub fn new(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn with_detail(code: ErrorCode, detail: String) -> Self {
        AppError::ApiError(code, Some(detail))
    }

    pub fn bad_request(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn unauthorized(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn forbidden(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn not_found(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn conflict(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn internal_error(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::ApiError(code, _) => *code,
            AppError::ValidationError(_) => ErrorCode::ValidationError,
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        // 드라이버 진단 정보는 로그로만 남기고 응답에는 싣지 않는다
        tracing::error!("데이터베이스 오류: {}", err);
        AppError::ApiError(ErrorCode::DatabaseError, None)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::error!("토큰 생성 실패: {}", err);
        AppError::ApiError(ErrorCode::TokenGenerationFailed, None)
    }
}

#[derive(serde::Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(serde::Serialize)]
struct ValidationErrorResponse {
    code: String,
    message: String,
    errors: Vec<ValidationFieldError>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.code().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::ApiError(code, detail) => {
                let response = ErrorResponse {
                    code: format!("{:?}", code),
                    message: code.message().to_string(),
                    detail: detail.clone(),
                };

                HttpResponse::build(code.status_code())
                    .json(response)
            }
            AppError::ValidationError(errors) => {
                let response = ValidationErrorResponse {
                    code: format!("{:?}", ErrorCode::ValidationError),
                    message: ErrorCode::ValidationError.message().to_string(),
                    errors: errors.clone(),
                };

                HttpResponse::build(ErrorCode::ValidationError.status_code())
                    .json(response)
            }
        }
    }
}
