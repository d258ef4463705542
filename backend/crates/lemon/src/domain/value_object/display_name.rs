//! Display Name Value Object
//!
//! The user's public name. Not unique, not used for login.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DISPLAY_NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DisplayNameError {
    #[error("Name cannot be blank")]
    Blank,

    #[error("Name must be at most 50 characters")]
    TooLong,

    #[error("Name cannot contain control characters")]
    InvalidCharacter,
}

impl DisplayNameError {
    pub fn code(&self) -> &'static str {
        match self {
            DisplayNameError::Blank => "Blank",
            DisplayNameError::TooLong => "TooLong",
            DisplayNameError::InvalidCharacter => "InvalidCharacter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(name: impl AsRef<str>) -> Result<Self, DisplayNameError> {
        let name = name.as_ref().trim();

        if name.is_empty() {
            return Err(DisplayNameError::Blank);
        }
        if name.chars().count() > DISPLAY_NAME_MAX_CHARS {
            return Err(DisplayNameError::TooLong);
        }
        if name.chars().any(char::is_control) {
            return Err(DisplayNameError::InvalidCharacter);
        }

        Ok(Self(name.to_string()))
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = DisplayNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DisplayName::new(value)
    }
}

impl From<DisplayName> for String {
    fn from(name: DisplayName) -> Self {
        name.0
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
