//! Mutation Aggregate
//!
//! Admin CRUD over the `Mutation` custom resource.

pub mod store;
pub mod api;

pub use store::{KubeMutationStore, MutationStore};
pub use api::{MutationsState, mutations_router};
