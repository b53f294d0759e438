//! Environment Revision Lookup Table

use std::sync::Arc;

use crate::environment::entity::EnvironmentRevision;
use crate::shared::error::Result;
use crate::shared::lookup_table::{LookupTable, TableSource};

pub struct EnvironmentRevisionCache {
    table: LookupTable<EnvironmentRevision>,
}

impl EnvironmentRevisionCache {
    pub fn new(source: Arc<dyn TableSource<EnvironmentRevision>>) -> Self {
        Self {
            table: LookupTable::new("environment_revisions", source),
        }
    }

    pub async fn get(&self, revision_id: &str) -> Result<Option<Arc<EnvironmentRevision>>> {
        self.table.get(revision_id).await
    }

    pub async fn find_by_environment_and_version(
        &self,
        environment_id: &str,
        version: i64,
    ) -> Result<Option<Arc<EnvironmentRevision>>> {
        let environment_id = environment_id.to_string();
        self.table
            .find(move |r| r.environment_id == environment_id && r.version == version)
            .await
    }

    pub async fn refresh(&self) -> Result<usize> {
        self.table.refresh().await
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
