// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., U_K7NP3X for users)
//!
//! Benefits:
//! - No ambiguous characters (excludes I, L, O, U)
//! - Case-insensitive
//! - ~1 billion combinations per entity type (32^6)
//! - Easy to read, type, and communicate verbally

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User (U_)
    User,
    /// Social account link (N_) - N for Network identity
    SocialAccount,
    /// Persona (P_)
    Persona,
    /// Conversation (C_)
    Conversation,
    /// Message (M_)
    Message,
}

impl EntityPrefix {
    fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::SocialAccount => "N",
            EntityPrefix::Persona => "P",
            EntityPrefix::Conversation => "C",
            EntityPrefix::Message => "M",
        }
    }
}

/// Generates a prefixed ID with 6 random Crockford Base32 characters
pub fn generate_id(prefix: EntityPrefix) -> String {
    let mut rng = rand::thread_rng();
    let random_part: String = (0..6)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect();

    format!("{}_{}", prefix.as_str(), random_part)
}

pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

pub fn generate_social_account_id() -> String {
    generate_id(EntityPrefix::SocialAccount)
}

pub fn generate_persona_id() -> String {
    generate_id(EntityPrefix::Persona)
}

pub fn generate_conversation_id() -> String {
    generate_id(EntityPrefix::Conversation)
}

pub fn generate_message_id() -> String {
    generate_id(EntityPrefix::Message)
}
