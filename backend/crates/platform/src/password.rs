//! Password Policy, Hashing and Verification
//!
//! NIST SP 800-63B compliant password handling with:
//! - A [`ClearTextPassword`] type that validates, normalizes and zeroizes
//! - A pluggable [`PasswordEncoder`] seam (one-way adaptive hashing)
//! - [`Argon2PasswordEncoder`], the default encoder (Argon2id, PHC strings)
//!
//! ## Security Features
//! - Memory-hard hashing prevents GPU/ASIC attacks
//! - Zeroization prevents memory inspection attacks
//! - Pepper support for additional security layer
//! - [`PasswordEncoder::match_dummy`] lets callers spend the same time on
//!   unknown accounts as on known ones

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Constants (NIST SP 800-63B compliant)
// ============================================================================

/// Minimum password length (NIST: SHALL be at least 8)
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (NIST: SHOULD permit at least 64)
pub const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    /// Control characters other than space, tab and newline
    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    /// Sequential, repeated, keyboard or dictionary passwords
    #[error("Password is too common or follows a predictable pattern")]
    CommonPattern,
}

impl PasswordPolicyError {
    /// Stable code used in field errors
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "TooShort",
            Self::TooLong { .. } => "TooLong",
            Self::EmptyOrWhitespace => "Blank",
            Self::InvalidCharacter => "InvalidCharacter",
            Self::CommonPattern => "CommonPassword",
        }
    }
}

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// ## Security
/// - Implements `Zeroize` and `ZeroizeOnDrop`
/// - Does not implement `Clone` to prevent accidental copies
/// - Debug output is redacted
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Create a new password that must satisfy the full policy
    ///
    /// Use this for passwords being *set* (signup, change, reset):
    /// - 8..=128 Unicode code points after NFKC normalization
    /// - No control characters
    /// - Not empty/whitespace only
    /// - Not a common or predictable pattern
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let candidate = Self::candidate(raw)?;
        let normalized = &candidate.0;

        let char_count = normalized.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        for ch in normalized.chars() {
            if ch.is_control() && ch != ' ' && ch != '\t' && ch != '\n' {
                return Err(PasswordPolicyError::InvalidCharacter);
            }
        }

        if is_common_pattern(normalized) {
            return Err(PasswordPolicyError::CommonPattern);
        }

        Ok(candidate)
    }

    /// Create a password that is only going to be *checked* (login)
    ///
    /// Only normalizes and bounds the length; the strength policy is not
    /// applied so that passwords set under an older policy still verify.
    pub fn candidate(raw: String) -> Result<Self, PasswordPolicyError> {
        let normalized: String = raw.nfkc().collect();
        let mut raw = raw;
        raw.zeroize();

        if normalized.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = normalized.chars().count();
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        Ok(Self(normalized))
    }

    /// Create without validation (tests only)
    #[cfg(test)]
    pub fn new_unchecked(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Encoder output, opaque to everything but the encoder that produced it
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wrap a stored hash (e.g. from the database)
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Encoders
// ============================================================================

/// One-way adaptive password hashing
pub trait PasswordEncoder: Send + Sync {
    /// Hash a password for storage
    fn encode(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError>;

    /// Whether `password` matches `hashed`. Must not short-circuit on content.
    fn matches(&self, password: &ClearTextPassword, hashed: &HashedPassword) -> bool;

    /// Whether `hashed` was produced with outdated parameters
    fn needs_rehash(&self, _hashed: &HashedPassword) -> bool {
        false
    }

    /// Spend roughly one verification's worth of work without a stored hash
    ///
    /// Called when the account does not exist so response time does not
    /// reveal that fact.
    fn match_dummy(&self, password: &ClearTextPassword) {
        let _ = self.encode(password);
    }
}

/// Argon2id encoder producing PHC strings
///
/// ## Examples
/// ```rust
/// use platform::password::{Argon2PasswordEncoder, ClearTextPassword, PasswordEncoder};
///
/// let encoder = Argon2PasswordEncoder::new(None);
/// let password = ClearTextPassword::new("Correct-Horse-42!".to_string()).unwrap();
/// let hashed = encoder.encode(&password).unwrap();
/// assert!(encoder.matches(&password, &hashed));
/// ```
#[derive(Clone, Default)]
pub struct Argon2PasswordEncoder {
    pepper: Option<Vec<u8>>,
}

impl Argon2PasswordEncoder {
    /// `pepper` is an optional application-wide secret appended before hashing
    pub fn new(pepper: Option<Vec<u8>>) -> Self {
        Self { pepper }
    }

    fn peppered(&self, password: &ClearTextPassword) -> Vec<u8> {
        let mut bytes = password.as_bytes().to_vec();
        if let Some(pepper) = &self.pepper {
            bytes.extend_from_slice(pepper);
        }
        bytes
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError> {
        use argon2::PasswordHasher;

        let mut bytes = self.peppered(password);
        let salt = SaltString::generate(&mut OsRng);

        // OWASP recommended Argon2id parameters (crate defaults):
        // m=19456 (19 MiB), t=2, p=1
        let result = Argon2::default()
            .hash_password(&bytes, &salt)
            .map(|hash| HashedPassword(hash.to_string()))
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()));
        bytes.zeroize();
        result
    }

    fn matches(&self, password: &ClearTextPassword, hashed: &HashedPassword) -> bool {
        let Ok(parsed) = PasswordHash::new(hashed.as_str()) else {
            return false;
        };

        let mut bytes = self.peppered(password);
        // Argon2 uses constant-time comparison internally
        let ok = Argon2::default().verify_password(&bytes, &parsed).is_ok();
        bytes.zeroize();
        ok
    }

    fn needs_rehash(&self, hashed: &HashedPassword) -> bool {
        match PasswordHash::new(hashed.as_str()) {
            Ok(parsed) => parsed.algorithm != argon2::Algorithm::Argon2id.ident(),
            Err(_) => true,
        }
    }
}

impl fmt::Debug for Argon2PasswordEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argon2PasswordEncoder")
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn is_common_pattern(password: &str) -> bool {
    let lower = password.to_lowercase();

    // All the same character (e.g. "aaaaaaaa")
    let mut chars = lower.chars();
    if let Some(first) = chars.next() {
        if chars.all(|c| c == first) {
            return true;
        }
    }

    if is_sequential_numbers(&lower) {
        return true;
    }

    const KEYBOARD_PATTERNS: &[&str] = &[
        "qwerty",
        "qwertyuiop",
        "asdfgh",
        "asdfghjkl",
        "zxcvbn",
        "qazwsx",
        "1qaz2wsx",
    ];

    if KEYBOARD_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }

    const COMMON_PASSWORDS: &[&str] = &[
        "password",
        "password1",
        "password123",
        "12345678",
        "123456789",
        "1234567890",
        "abcdefgh",
        "letmein",
        "welcome",
        "admin123",
        "iloveyou",
        "sunshine",
        "princess",
        "football",
        "baseball",
        "trustno1",
    ];

    COMMON_PASSWORDS.contains(&lower.as_str())
}

fn is_sequential_numbers(s: &str) -> bool {
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < 4 || digits.len() != s.chars().count() {
        return false;
    }

    let is_ascending = digits
        .windows(2)
        .all(|w| w[1] == w[0] + 1 || (w[0] == 9 && w[1] == 0));

    let is_descending = digits
        .windows(2)
        .all(|w| w[0] == w[1] + 1 || (w[0] == 0 && w[1] == 9));

    is_ascending || is_descending
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_too_short() {
        let result = ClearTextPassword::new("short".to_string());
        assert!(matches!(result, Err(PasswordPolicyError::TooShort { .. })));
    }

    #[test]
    fn test_password_too_long() {
        let long_password = "ab".repeat(MAX_PASSWORD_LENGTH);
        let result = ClearTextPassword::new(long_password);
        assert!(matches!(result, Err(PasswordPolicyError::TooLong { .. })));
    }

    #[test]
    fn test_password_whitespace_only() {
        let result = ClearTextPassword::new("        ".to_string());
        assert!(matches!(
            result,
            Err(PasswordPolicyError::EmptyOrWhitespace)
        ));
    }

    #[test]
    fn test_password_common_pattern() {
        for weak in ["password123", "qwertyuiop", "12345678", "zzzzzzzzzz"] {
            let result = ClearTextPassword::new(weak.to_string());
            assert!(
                matches!(result, Err(PasswordPolicyError::CommonPattern)),
                "{weak} should be rejected"
            );
        }
    }

    #[test]
    fn test_password_control_character() {
        let result = ClearTextPassword::new("Correct\u{7}Horse42".to_string());
        assert!(matches!(result, Err(PasswordPolicyError::InvalidCharacter)));
    }

    #[test]
    fn test_valid_and_unicode_passwords() {
        assert!(ClearTextPassword::new("MySecure#Pass2024!".to_string()).is_ok());
        assert!(ClearTextPassword::new("パスワード安全です!".to_string()).is_ok());
    }

    #[test]
    fn test_candidate_skips_strength_policy() {
        assert!(ClearTextPassword::candidate("short".to_string()).is_ok());
        assert!(ClearTextPassword::candidate("password".to_string()).is_ok());
        assert!(ClearTextPassword::candidate("   ".to_string()).is_err());
        assert!(ClearTextPassword::candidate("x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_nfkc_normalization_matches() {
        let encoder = Argon2PasswordEncoder::new(None);
        // Fullwidth letters normalize to ASCII under NFKC
        let fullwidth = ClearTextPassword::new("ＣｏｒｒｅｃｔＨｏｒｓｅ42".to_string()).unwrap();
        let ascii = ClearTextPassword::new("CorrectHorse42".to_string()).unwrap();
        let hashed = encoder.encode(&fullwidth).unwrap();
        assert!(encoder.matches(&ascii, &hashed));
    }

    #[test]
    fn test_encode_and_match() {
        let encoder = Argon2PasswordEncoder::new(None);
        let password = ClearTextPassword::new_unchecked("TestPassword123!".to_string());
        let hashed = encoder.encode(&password).unwrap();

        assert!(hashed.as_str().starts_with("$argon2id$"));
        assert!(encoder.matches(&password, &hashed));
        assert!(!encoder.needs_rehash(&hashed));

        let wrong = ClearTextPassword::new_unchecked("WrongPassword123!".to_string());
        assert!(!encoder.matches(&wrong, &hashed));
    }

    #[test]
    fn test_salted_hashes_differ() {
        let encoder = Argon2PasswordEncoder::new(None);
        let password = ClearTextPassword::new_unchecked("TestPassword123!".to_string());
        let a = encoder.encode(&password).unwrap();
        let b = encoder.encode(&password).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_pepper_must_match() {
        let peppered = Argon2PasswordEncoder::new(Some(b"my_secret_pepper".to_vec()));
        let plain = Argon2PasswordEncoder::new(None);
        let other = Argon2PasswordEncoder::new(Some(b"wrong_pepper".to_vec()));

        let password = ClearTextPassword::new_unchecked("TestPassword123!".to_string());
        let hashed = peppered.encode(&password).unwrap();

        assert!(peppered.matches(&password, &hashed));
        assert!(!plain.matches(&password, &hashed));
        assert!(!other.matches(&password, &hashed));
    }

    #[test]
    fn test_garbage_hash_never_matches() {
        let encoder = Argon2PasswordEncoder::new(None);
        let password = ClearTextPassword::new_unchecked("TestPassword123!".to_string());
        let garbage = HashedPassword::new("not_a_valid_hash");
        assert!(!encoder.matches(&password, &garbage));
        assert!(encoder.needs_rehash(&garbage));
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::new_unchecked("secret".to_string());
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret"));

        let encoder = Argon2PasswordEncoder::new(Some(b"pepper".to_vec()));
        assert!(!format!("{:?}", encoder).contains("pepper\""));
    }
}
