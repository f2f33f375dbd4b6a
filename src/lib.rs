// Library exports for Warbler
// This allows integration tests and the binary to share the same modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod repository;
pub mod routes;
pub mod seed;
pub mod state;
