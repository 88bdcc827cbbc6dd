//! Public link token generation.

use rand::Rng;

/// Generates tokens for special public download links.
///
/// Tokens are 32 cryptographically random bytes hex-encoded to a fixed 64
/// characters; possession of one is the sole credential for anonymous
/// download. The catalog still enforces uniqueness against the stored
/// tokens and asks for a fresh one on the (effectively impossible)
/// collision.
#[derive(Debug, Clone)]
pub struct LinkService;

impl LinkService {
    /// Creates a new link service.
    pub fn new() -> Self {
        Self
    }

    /// Generates a cryptographically secure random link token.
    pub fn generate_token(&self) -> String {
        let mut rng = rand::thread_rng();
        let bytes: Vec<u8> = (0..32).map(|_| rng.r#gen()).collect();
        hex::encode(bytes)
    }
}

impl Default for LinkService {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple hex encoding without external dependency.
mod hex {
    /// Encode bytes to hex string.
    pub fn encode(bytes: Vec<u8>) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_fixed_length_hex() {
        let token = LinkService::new().generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_do_not_repeat() {
        let links = LinkService::new();
        let a = links.generate_token();
        let b = links.generate_token();
        assert_ne!(a, b);
    }
}
