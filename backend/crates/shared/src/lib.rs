//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of vocabulary shared by every
//! Lemon crate:
//! - The unified error type, its classification and field-level errors
//! - The error normalizer that turns any failure into one stable payload
//! - Typed ID wrappers
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all domains.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod field;
    pub mod kind;
    pub mod normalizer;
}
pub mod id;
