//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod error;
pub mod middleware;
pub mod api_common;
pub mod document;
pub mod lookup_table;

// APIs
pub mod health_api;
pub mod cache_api;

// Re-export commonly used items
pub use error::{PlatformError, Result};
pub use middleware::{AppState, AuthLayer, Caller, ForwardedCredentials};
pub use lookup_table::{Keyed, LookupTable, TableSource};
pub use health_api::{health_router, HealthState};
pub use cache_api::{cache_router, cache_legacy_router, CacheState};
