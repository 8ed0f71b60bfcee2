pub mod auth;
pub mod health_check;
pub mod schedule;
pub mod shift;
pub mod substitute_request;

pub use crate::api::auth::{register, login, refresh_token, get_me};
pub use crate::api::schedule::{batch_create_shifts, batch_delete_shifts};
pub use crate::api::shift::{create_shift, list_shifts, get_shift, update_shift, delete_shift};
pub use crate::api::substitute_request::{
    create_substitute_request, list_substitute_requests, get_substitute_request,
    decide_substitute_request, delete_substitute_request,
};
