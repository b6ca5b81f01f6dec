// Auth services - verification, resolution, token issuance, session glue

pub mod resolver;
pub mod session;
pub mod tokens;
pub mod verifier;

pub use resolver::IdentityResolver;
pub use session::{LoginOutcome, SessionService};
pub use tokens::{TokenConfig, TokenKind, TokenService};
pub use verifier::{Credential, IdentityVerifier, VerifiedIdentity, VerifierConfig};
