//! Project Aggregate

pub mod entity;
pub mod repository;
pub mod cache;
pub mod api;

pub use entity::Project;
pub use repository::ProjectRepository;
pub use cache::ProjectCache;
pub use api::{ProjectsState, projects_router, projects_legacy_router};
