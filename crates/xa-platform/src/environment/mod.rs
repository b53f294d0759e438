//! Environment Revision Aggregate
//!
//! Revision snapshot table, base image resolution, and the enriched
//! environment listing.

pub mod entity;
pub mod repository;
pub mod cache;
pub mod resolver;
pub mod api;

pub use entity::EnvironmentRevision;
pub use repository::EnvironmentRevisionRepository;
pub use cache::EnvironmentRevisionCache;
pub use resolver::{BaseImageResolver, Resolution, MAX_HIERARCHY_DEPTH};
pub use api::{EnvironmentsState, environments_router, environments_legacy_router};
