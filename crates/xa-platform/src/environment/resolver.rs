//! Base Image Resolver
//!
//! Follows `baseEnvironmentRevisionId` pointers from a revision until one
//! names a docker image. Failures are reported in the status text and never
//! surface as errors.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use crate::environment::cache::EnvironmentRevisionCache;
use crate::shared::error::PlatformError;

/// Upper bound on parent hops. Protects against cycles in stored data.
pub const MAX_HIERARCHY_DEPTH: usize = 100;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_NOT_IN_HIERARCHY: &str = "could not find revision (in hierarchy)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Resolution {
    pub image: Option<String>,
    pub status: String,
}

impl Resolution {
    pub fn success(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            status: STATUS_SUCCESS.to_string(),
        }
    }

    pub fn revision_not_found(environment_id: &str, version: i64) -> Self {
        Self {
            image: None,
            status: format!("could not find revision: {}-{}", environment_id, version),
        }
    }

    pub fn not_in_hierarchy() -> Self {
        Self {
            image: None,
            status: STATUS_NOT_IN_HIERARCHY.to_string(),
        }
    }

    pub fn load_failed(err: &PlatformError) -> Self {
        Self {
            image: None,
            status: format!("could not load environment revisions: {}", err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.image.is_some()
    }
}

pub struct BaseImageResolver {
    revisions: Arc<EnvironmentRevisionCache>,
}

impl BaseImageResolver {
    pub fn new(revisions: Arc<EnvironmentRevisionCache>) -> Self {
        Self { revisions }
    }

    pub async fn resolve(&self, environment_id: &str, version: i64) -> Resolution {
        let mut current = match self
            .revisions
            .find_by_environment_and_version(environment_id, version)
            .await
        {
            Ok(Some(revision)) => revision,
            Ok(None) => return Resolution::revision_not_found(environment_id, version),
            Err(e) => {
                warn!(environment_id, version, error = %e, "Environment revision load failed");
                return Resolution::load_failed(&e);
            }
        };

        let mut hops = 0;
        loop {
            if let Some(image) = &current.docker_image {
                return Resolution::success(image.clone());
            }

            let Some(parent_id) = current.base_environment_revision_id.clone() else {
                return Resolution::not_in_hierarchy();
            };

            if hops == MAX_HIERARCHY_DEPTH {
                warn!(environment_id, version, hops, "Revision hierarchy too deep, giving up");
                return Resolution::not_in_hierarchy();
            }
            hops += 1;

            current = match self.revisions.get(&parent_id).await {
                Ok(Some(parent)) => parent,
                Ok(None) => return Resolution::not_in_hierarchy(),
                Err(e) => {
                    warn!(environment_id, version, error = %e, "Environment revision load failed");
                    return Resolution::load_failed(&e);
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::entity::EnvironmentRevision;
    use crate::shared::lookup_table::testing::VecSource;

    fn resolver(revisions: Vec<EnvironmentRevision>) -> (BaseImageResolver, Arc<VecSource<EnvironmentRevision>>) {
        let source = Arc::new(VecSource::new(revisions));
        let cache = Arc::new(EnvironmentRevisionCache::new(source.clone()));
        (BaseImageResolver::new(cache), source)
    }

    #[tokio::test]
    async fn test_direct_image() {
        let (resolver, _) = resolver(vec![
            EnvironmentRevision::new("r1", "env", 1).with_image("img:1"),
        ]);

        assert_eq!(resolver.resolve("env", 1).await, Resolution::success("img:1"));
    }

    #[tokio::test]
    async fn test_image_wins_over_parent() {
        let (resolver, _) = resolver(vec![
            EnvironmentRevision::new("r1", "env", 1).with_image("own").with_parent("r0"),
            EnvironmentRevision::new("r0", "base", 1).with_image("inherited"),
        ]);

        assert_eq!(resolver.resolve("env", 1).await.image.as_deref(), Some("own"));
    }

    #[tokio::test]
    async fn test_three_hop_chain_resolves_like_root() {
        let (resolver, _) = resolver(vec![
            EnvironmentRevision::new("leaf", "env", 3).with_parent("mid"),
            EnvironmentRevision::new("mid", "base", 2).with_parent("root"),
            EnvironmentRevision::new("root", "root-env", 1).with_image("root:latest"),
        ]);

        let resolution = resolver.resolve("env", 3).await;
        assert!(resolution.is_success());
        assert_eq!(resolution, Resolution::success("root:latest"));
        assert_eq!(resolver.resolve("root-env", 1).await, Resolution::success("root:latest"));
    }

    #[tokio::test]
    async fn test_missing_parent() {
        let (resolver, source) = resolver(vec![
            EnvironmentRevision::new("leaf", "env", 1).with_parent("gone"),
        ]);

        let resolution = resolver.resolve("env", 1).await;
        assert!(!resolution.is_success());
        assert_eq!(resolution.image, None);
        assert_eq!(resolution.status, "could not find revision (in hierarchy)");
        // initial scan miss refresh + one refresh for the missing parent
        assert_eq!(source.loads(), 2);
    }

    #[tokio::test]
    async fn test_no_image_and_no_parent() {
        let (resolver, _) = resolver(vec![EnvironmentRevision::new("r1", "env", 1)]);
        assert_eq!(resolver.resolve("env", 1).await, Resolution::not_in_hierarchy());
    }

    #[tokio::test]
    async fn test_missing_start() {
        let (resolver, _) = resolver(vec![]);
        let resolution = resolver.resolve("abc123", 7).await;
        assert_eq!(resolution.image, None);
        assert_eq!(resolution.status, "could not find revision: abc123-7");
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let (resolver, _) = resolver(vec![
            EnvironmentRevision::new("a", "env", 1).with_parent("b"),
            EnvironmentRevision::new("b", "env", 2).with_parent("a"),
        ]);

        assert_eq!(resolver.resolve("env", 1).await, Resolution::not_in_hierarchy());
    }

    #[tokio::test]
    async fn test_store_failure_reported_in_status() {
        let (resolver, source) = resolver(vec![]);
        source.fail_with("connection refused");

        let resolution = resolver.resolve("env", 1).await;
        assert_eq!(resolution.image, None);
        assert_eq!(
            resolution.status,
            "could not load environment revisions: Internal error: connection refused"
        );
    }
}
