pub mod shift;
pub mod substitute_request;
pub mod user;
