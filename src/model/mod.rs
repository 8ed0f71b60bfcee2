pub mod auth;
pub mod global_error;
pub mod schedule;
pub mod shift;
pub mod substitute_request;

pub use auth::{RegisterRequest, LoginRequest, Claims, UserResponse};
