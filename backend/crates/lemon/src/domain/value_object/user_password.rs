//! User Password Value Object
//!
//! Bridges `platform::password` into form validation. Policy violations
//! become field errors carrying the form field's name, so signup, change
//! and reset report them uniformly.

use kernel::error::field::{FieldError, FieldErrors};
use platform::password::{ClearTextPassword, PasswordPolicyError};

/// A password being set: full policy applies
pub fn new_password(field: &str, raw: String) -> Result<ClearTextPassword, FieldError> {
    ClearTextPassword::new(raw).map_err(|e| policy_field_error(field, &e))
}

/// A password being checked: only normalization and length bounds apply
pub fn candidate_password(raw: String) -> Option<ClearTextPassword> {
    ClearTextPassword::candidate(raw).ok()
}

pub fn policy_field_error(field: &str, err: &PasswordPolicyError) -> FieldError {
    FieldError::new(field, err.code(), err.to_string())
}

/// Validate `password` and `retype` together, collecting every failure
///
/// Returns the parsed password only when both checks pass.
pub fn new_password_with_retype(
    errors: &mut FieldErrors,
    field: &str,
    password: String,
    retype_field: &str,
    retype: &str,
) -> Option<ClearTextPassword> {
    if password != retype {
        errors.add(retype_field, "PasswordMismatch", "Passwords do not match");
    }

    match new_password(field, password) {
        Ok(password) if !errors.has(retype_field) => Some(password),
        Ok(_) => None,
        Err(e) => {
            errors.push(e);
            None
        }
    }
}
