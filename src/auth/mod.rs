//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Multi-provider login (password, Naver, Kakao, federated ID token, guest)
//! - Identity resolution (find-or-create user, external identity linking)
//! - JWT access/refresh token issuance and validation
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
