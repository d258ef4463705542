//! Presentation Layer
//!
//! HTTP handlers, DTOs, extractors, router, and middleware.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use extract::{ClientContext, CurrentUser, LemonJson, LemonQuery, MaybeUser};
pub use handlers::LemonAppState;
pub use middleware::resolve_principal;
pub use router::{API_PREFIX, lemon_router, lemon_router_generic, lemon_router_with_state};
