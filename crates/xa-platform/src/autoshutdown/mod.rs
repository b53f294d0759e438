//! Workspace Auto-Shutdown Aggregate
//!
//! Bulk push of auto-shutdown durations into user preferences, driven by the
//! platform's central config.

pub mod entity;
pub mod policy;
pub mod repository;
pub mod api;

pub use entity::{AutoShutdownRequest, AutoShutdownSettings, NoOpReason, PreferenceAction, PreferenceUpdate, UserPreferenceSnapshot};
pub use policy::{apply_rules, plan_for_user, ApplyOutcome};
pub use repository::{AutoShutdownRepository, AutoShutdownStore, CentralConfigRepository};
pub use api::{AutoShutdownState, autoshutdown_router, autoshutdown_legacy_router};
