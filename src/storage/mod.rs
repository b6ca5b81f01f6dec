//! Storage module
//!
//! Presigned S3 URL issuance for profile and persona images.

pub mod handlers;
pub mod models;
pub mod routes;

pub use routes::storage_routes;
