//! Project Lookup Table

use std::sync::Arc;

use crate::project::entity::Project;
use crate::shared::error::Result;
use crate::shared::lookup_table::{LookupTable, TableSource};

pub struct ProjectCache {
    table: LookupTable<Project>,
}

impl ProjectCache {
    pub fn new(source: Arc<dyn TableSource<Project>>) -> Self {
        Self {
            table: LookupTable::new("projects", source),
        }
    }

    /// Scan for the project, refreshing once on a miss.
    pub async fn find_by_project(&self, project_id: &str) -> Result<Option<Arc<Project>>> {
        let project_id = project_id.to_string();
        self.table.find(move |p| p.id == project_id).await
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
