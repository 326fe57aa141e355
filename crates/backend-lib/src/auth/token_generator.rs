// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
//! Session token generation.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Default token size in bytes (32 bytes = 256 bits of entropy)
const DEFAULT_TOKEN_BYTES: usize = 32;

/// Generate a random session token.
///
/// The bytes come from the thread-local CSPRNG (seeded from the OS) and are
/// encoded as URL-safe base64 without padding, so the token can be placed in
/// a cookie as is.
pub fn generate_secure_token() -> String {
    generate_secure_token_with_size(DEFAULT_TOKEN_BYTES)
}

/// Generate a random token of `bytes` bytes of entropy
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation() {
        let token1 = generate_secure_token();
        let token2 = generate_secure_token();
        assert_ne!(token1, token2);

        // 32 bytes encode to 43 characters without padding
        assert_eq!(token1.len(), 43);
        assert!(!token1.contains('='));
        assert!(token1.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        let small_token = generate_secure_token_with_size(16);
        let large_token = generate_secure_token_with_size(64);
        assert!(small_token.len() < token1.len());
        assert!(large_token.len() > token1.len());
    }

    #[test]
    fn test_token_decodes_to_requested_size() {
        let token = generate_secure_token_with_size(24);
        let bytes = URL_SAFE_NO_PAD.decode(token).unwrap();
        assert_eq!(bytes.len(), 24);
    }
}
