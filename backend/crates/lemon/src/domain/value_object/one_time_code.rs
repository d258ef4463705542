//! One-time codes for email verification and password reset
//!
//! The plain code travels only in the mail link; the database keeps its
//! SHA-256 so a leaked table cannot be replayed.

use platform::crypto::{constant_time_eq, hash_code, random_token};

/// Entropy of a generated code
pub const ONE_TIME_CODE_BYTES: usize = 32;

pub struct OneTimeCode {
    plain: String,
    hash: String,
}

impl OneTimeCode {
    pub fn generate() -> Self {
        let plain = random_token(ONE_TIME_CODE_BYTES);
        let hash = hash_code(&plain);
        Self { plain, hash }
    }

    /// The code to put in the mail
    pub fn plain(&self) -> &str {
        &self.plain
    }

    /// What gets stored
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Whether `presented` hashes to `stored_hash`
    pub fn matches(presented: &str, stored_hash: &str) -> bool {
        constant_time_eq(hash_code(presented).as_bytes(), stored_hash.as_bytes())
    }
}

impl std::fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneTimeCode")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_matches_its_hash() {
        let code = OneTimeCode::generate();
        assert_ne!(code.plain(), code.hash());
        assert!(OneTimeCode::matches(code.plain(), code.hash()));
        assert!(!OneTimeCode::matches("guess", code.hash()));
        assert!(!format!("{code:?}").contains(code.plain()));
    }
}
