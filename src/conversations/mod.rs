//! Conversations module
//!
//! Persona-bound chat threads: a conversation belongs to one user and one
//! persona, and each sent message produces an AI reply in the same turn.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
mod tests;

pub use models::{Conversation, Message};
pub use routes::conversations_routes;
