pub mod auth;
pub mod client;
pub mod metadata_server;
pub mod models;
