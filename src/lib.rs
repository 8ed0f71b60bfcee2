pub mod api;
pub mod auth;
pub mod db;
pub mod entity;
pub mod migration;
pub mod model;
pub mod telemetry;
pub mod util;
