//! Per-sandbox credentials

use rand::distr::Alphanumeric;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

/// Length of generated tokens
pub const TOKEN_LENGTH: usize = 32;

/// Generate a random alphanumeric token.
///
/// `rand::rng()` is a CSPRNG reseeded from the OS, so tokens are unpredictable.
pub fn generate_token() -> SecretString {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect();
    SecretString::from(token)
}

/// Derive the session id from a token.
///
/// Name-based UUID, so the id discriminates mount directories without
/// revealing the token itself.
pub fn session_id_for(token: &SecretString) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, token.expose_secret().as_bytes())
        .simple()
        .to_string()
}
