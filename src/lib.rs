pub mod auth;
pub mod config;
pub mod driver;
pub mod errors;
pub mod keepalive;
pub mod models;
pub mod policy;
pub mod supervisor;
pub mod target;
