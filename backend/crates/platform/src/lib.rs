//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, HMAC, Base64, random tokens)
//! - Password policy and pluggable password encoders (Argon2id default)
//! - Cookie management and client fingerprinting
//! - Outbound integrations: mail delivery and CAPTCHA verification
//! - HTTP hardening: CORS layer and the JSON vulnerability prefix

pub mod captcha;
pub mod client;
pub mod cookie;
pub mod cors;
pub mod crypto;
pub mod json_prefix;
pub mod mail;
pub mod password;
