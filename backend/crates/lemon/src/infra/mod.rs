//! Infrastructure Layer
//!
//! Repository implementations: PostgreSQL for deployments, in-memory for
//! development without a database and for tests.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryLemonRepository;
pub use postgres::PgLemonRepository;
