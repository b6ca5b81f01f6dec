// src/services/mod.rs
//
// Shared services module containing clients for external collaborators
// (generative-AI chat endpoint, object storage)

pub mod gemini;
pub mod s3;

// Re-export commonly used types for convenience
pub use gemini::{GeminiConfig, GeminiService};
pub use s3::{S3Config, S3Service};
