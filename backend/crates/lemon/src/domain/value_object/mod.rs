//! Value Object Module

pub mod display_name;
pub mod email;
pub mod one_time_code;
pub mod role;
pub mod user_password;

pub use kernel::id::{SessionId, UserId};
