//! # Personas Module
//!
//! AI chat personas: the name, profile and system prompt each conversation
//! is opened against.

pub mod handlers;
pub mod models;
pub mod routes;

pub use models::Persona;
pub use routes::personas_routes;
